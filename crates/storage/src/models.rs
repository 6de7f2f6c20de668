//! Marketplace records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Farmer,
    Buyer,
}

/// Preferred language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Te,
    Hi,
    En,
}

impl Language {
    /// Parse a language tag such as `te`, `hi-IN` or `en-US`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "te" => Some(Language::Te),
            "hi" => Some(Language::Hi),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Te => "te",
            Language::Hi => "hi",
            Language::En => "en",
        }
    }
}

/// Field soil type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilType {
    BlackCotton,
    RedLoam,
}

/// Crop lifecycle, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    Growing,
    Harvested,
    Stored,
    Transported,
    Sold,
}

impl LifecycleStatus {
    /// Next status, `None` once sold
    pub fn next(&self) -> Option<Self> {
        match self {
            LifecycleStatus::Growing => Some(LifecycleStatus::Harvested),
            LifecycleStatus::Harvested => Some(LifecycleStatus::Stored),
            LifecycleStatus::Stored => Some(LifecycleStatus::Transported),
            LifecycleStatus::Transported => Some(LifecycleStatus::Sold),
            LifecycleStatus::Sold => None,
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Growing => "growing",
            LifecycleStatus::Harvested => "harvested",
            LifecycleStatus::Stored => "stored",
            LifecycleStatus::Transported => "transported",
            LifecycleStatus::Sold => "sold",
        }
    }
}

/// Listing status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Open,
    Matched,
    Closed,
}

impl ListingStatus {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Open => "open",
            ListingStatus::Matched => "matched",
            ListingStatus::Closed => "closed",
        }
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub uid: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub district: String,
    pub mandal: String,
    pub language: Language,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Farmer crop profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerRecord {
    pub uid: String,
    pub crop: String,
    pub variety: String,
    #[serde(rename = "sownDate")]
    pub sown_date: String,
    #[serde(rename = "fieldSize_acres")]
    pub field_size_acres: f64,
    #[serde(rename = "soilType")]
    pub soil_type: SoilType,
    pub district: String,
    pub mandal: String,
    #[serde(rename = "expectedQtl")]
    pub expected_qtl: Option<u32>,
    #[serde(rename = "quantityConfirmed")]
    pub quantity_confirmed: bool,
    pub viability_days: i32,
    #[serde(rename = "harvestWeek")]
    pub harvest_week: u8,
    pub status: LifecycleStatus,
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: Option<u32>,
    #[serde(rename = "actualPrice")]
    pub actual_price: Option<u32>,
}

impl FarmerRecord {
    /// Calendar slot this farmer harvests in
    pub fn calendar_key(&self) -> CalendarKey {
        CalendarKey::new(&self.mandal, &self.crop, self.harvest_week)
    }
}

/// Buyer business profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyerRecord {
    pub uid: String,
    #[serde(rename = "businessName")]
    pub business_name: String,
    pub district: String,
    pub phone: String,
}

/// Buyer demand listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "listingId")]
    pub listing_id: String,
    #[serde(rename = "buyerUid")]
    pub buyer_uid: String,
    pub crop: String,
    pub variety: String,
    #[serde(rename = "quantityQtl")]
    pub quantity_qtl: u32,
    #[serde(rename = "targetDate")]
    pub target_date: String,
    #[serde(rename = "pricePerQtl")]
    pub price_per_qtl: u32,
    pub district: String,
    #[serde(rename = "isBelowMSP")]
    pub is_below_msp: bool,
    pub status: ListingStatus,
    #[serde(rename = "postedAt")]
    pub posted_at: DateTime<Utc>,
}

/// Agreed trade between a farmer and a buyer listing; never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    #[serde(rename = "matchId")]
    pub match_id: String,
    #[serde(rename = "farmerUid")]
    pub farmer_uid: String,
    #[serde(rename = "buyerUid")]
    pub buyer_uid: String,
    #[serde(rename = "listingId")]
    pub listing_id: String,
    pub crop: String,
    #[serde(rename = "quantityQtl")]
    pub quantity_qtl: u32,
    #[serde(rename = "pricePerQtl")]
    pub price_per_qtl: u32,
    #[serde(rename = "matchedAt")]
    pub matched_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Build the match for a farmer accepting a listing
    pub fn for_listing(farmer_uid: &str, listing: &ListingRecord, matched_at: DateTime<Utc>) -> Self {
        Self {
            match_id: format!(
                "match_{}_{}_{}",
                farmer_uid,
                listing.listing_id,
                matched_at.timestamp_millis()
            ),
            farmer_uid: farmer_uid.to_string(),
            buyer_uid: listing.buyer_uid.clone(),
            listing_id: listing.listing_id.clone(),
            crop: listing.crop.clone(),
            quantity_qtl: listing.quantity_qtl,
            price_per_qtl: listing.price_per_qtl,
            matched_at,
        }
    }
}

/// Harvest calendar slot key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalendarKey {
    pub mandal: String,
    pub crop: String,
    pub week: u8,
}

impl CalendarKey {
    /// Create a new key
    pub fn new(mandal: &str, crop: &str, week: u8) -> Self {
        Self {
            mandal: mandal.to_string(),
            crop: crop.to_string(),
            week,
        }
    }

    /// Document id, e.g. `Warangal Urban_paddy_1`
    pub fn doc_id(&self) -> String {
        format!("{}_{}_{}", self.mandal, self.crop, self.week)
    }
}

/// Farmers harvesting one crop in one mandal in one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub mandal: String,
    pub crop: String,
    pub week: u8,
    #[serde(rename = "farmerCount")]
    pub farmer_count: u32,
    #[serde(rename = "farmerUids")]
    pub farmer_uids: Vec<String>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl CalendarEntry {
    /// Empty slot for a key
    pub fn empty(key: &CalendarKey, now: DateTime<Utc>) -> Self {
        Self {
            mandal: key.mandal.clone(),
            crop: key.crop.clone(),
            week: key.week,
            farmer_count: 0,
            farmer_uids: Vec::new(),
            updated_at: now,
        }
    }

    /// Slot key
    pub fn key(&self) -> CalendarKey {
        CalendarKey::new(&self.mandal, &self.crop, self.week)
    }

    /// Add a farmer if absent; returns whether the slot changed
    pub fn add_farmer(&mut self, uid: &str, now: DateTime<Utc>) -> bool {
        if self.farmer_uids.iter().any(|u| u == uid) {
            return false;
        }
        self.farmer_uids.push(uid.to_string());
        self.farmer_count = self.farmer_count.saturating_add(1);
        self.updated_at = now;
        true
    }

    /// Remove a farmer if present; returns whether the slot changed
    pub fn remove_farmer(&mut self, uid: &str, now: DateTime<Utc>) -> bool {
        let before = self.farmer_uids.len();
        self.farmer_uids.retain(|u| u != uid);
        if self.farmer_uids.len() == before {
            return false;
        }
        self.farmer_count = self.farmer_count.saturating_sub(1);
        self.updated_at = now;
        true
    }
}

/// Minimum Support Price for a crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MspValue {
    pub crop: String,
    #[serde(rename = "pricePerQtl")]
    pub price_per_qtl: u32,
    pub season: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_order() {
        let mut status = LifecycleStatus::Growing;
        let mut seen = vec![status];
        while let Some(next) = status.next() {
            assert!(next > status);
            seen.push(next);
            status = next;
        }
        assert_eq!(seen.len(), 5);
        assert_eq!(status, LifecycleStatus::Sold);
    }

    #[test]
    fn test_language_tags() {
        assert_eq!(Language::from_tag("hi-IN"), Some(Language::Hi));
        assert_eq!(Language::from_tag("EN"), Some(Language::En));
        assert_eq!(Language::from_tag("fr"), None);
    }

    #[test]
    fn test_calendar_membership() {
        let now = Utc::now();
        let mut entry = CalendarEntry::empty(&CalendarKey::new("Kazipet", "paddy", 3), now);

        assert!(entry.add_farmer("f1", now));
        assert!(!entry.add_farmer("f1", now));
        assert!(entry.add_farmer("f2", now));
        assert_eq!(entry.farmer_count, 2);

        assert!(entry.remove_farmer("f1", now));
        assert!(!entry.remove_farmer("f1", now));
        assert_eq!(entry.farmer_count, 1);
        assert_eq!(entry.key().doc_id(), "Kazipet_paddy_3");
    }

    #[test]
    fn test_farmer_wire_names() {
        let farmer = FarmerRecord {
            uid: "f1".to_string(),
            crop: "paddy".to_string(),
            variety: "Sona Masuri".to_string(),
            sown_date: "2024-09-01".to_string(),
            field_size_acres: 5.0,
            soil_type: SoilType::BlackCotton,
            district: "Warangal".to_string(),
            mandal: "Warangal Urban".to_string(),
            expected_qtl: None,
            quantity_confirmed: false,
            viability_days: 14,
            harvest_week: 1,
            status: LifecycleStatus::Growing,
            estimated_price: None,
            actual_price: None,
        };

        let json = serde_json::to_value(&farmer).unwrap();
        assert_eq!(json["fieldSize_acres"], 5.0);
        assert_eq!(json["soilType"], "black_cotton");
        assert_eq!(json["harvestWeek"], 1);
        assert_eq!(json["status"], "growing");
        assert!(json["actualPrice"].is_null());
    }
}
