//! In-memory repository

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::models::{
    BuyerRecord, CalendarEntry, CalendarKey, FarmerRecord, LifecycleStatus, ListingRecord,
    ListingStatus, MatchRecord, MspValue, UserRecord,
};
use crate::{MarketStore, StorageError};

#[derive(Default)]
struct Tables {
    users: HashMap<String, UserRecord>,
    farmers: HashMap<String, FarmerRecord>,
    buyers: HashMap<String, BuyerRecord>,
    msp_values: HashMap<String, MspValue>,
    calendar: HashMap<CalendarKey, CalendarEntry>,
    listings: HashMap<String, ListingRecord>,
    matches: Vec<MatchRecord>,
}

/// Repository keeping every collection behind one lock
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create a new in-memory repository
    pub fn new() -> Self {
        info!("Creating in-memory repository");
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StorageError> {
        self.tables
            .lock()
            .map_err(|e| StorageError::DatabaseError(format!("Lock error: {}", e)))
    }

    /// Total match count
    pub fn match_count(&self) -> usize {
        self.tables.lock().map(|t| t.matches.len()).unwrap_or(0)
    }

    /// Total listing count
    pub fn listing_count(&self) -> usize {
        self.tables.lock().map(|t| t.listings.len()).unwrap_or(0)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn put_user(&self, user: UserRecord) -> Result<(), StorageError> {
        self.lock()?.users.insert(user.uid.clone(), user);
        Ok(())
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StorageError> {
        Ok(self.lock()?.users.get(uid).cloned())
    }

    async fn put_farmer(&self, farmer: FarmerRecord) -> Result<(), StorageError> {
        self.lock()?.farmers.insert(farmer.uid.clone(), farmer);
        Ok(())
    }

    async fn get_farmer(&self, uid: &str) -> Result<Option<FarmerRecord>, StorageError> {
        Ok(self.lock()?.farmers.get(uid).cloned())
    }

    async fn set_farmer_status(
        &self,
        uid: &str,
        from: LifecycleStatus,
        to: LifecycleStatus,
    ) -> Result<FarmerRecord, StorageError> {
        let mut tables = self.lock()?;
        let farmer = tables.farmers.get_mut(uid).ok_or(StorageError::NotFound)?;
        if farmer.status != from {
            return Err(StorageError::Conflict(format!(
                "farmer {} is {}, not {}",
                uid,
                farmer.status.as_str(),
                from.as_str()
            )));
        }
        farmer.status = to;
        debug!("Farmer {} status {} -> {}", uid, from.as_str(), to.as_str());
        Ok(farmer.clone())
    }

    async fn set_actual_price(&self, uid: &str, price_per_qtl: u32) -> Result<FarmerRecord, StorageError> {
        let mut tables = self.lock()?;
        let farmer = tables.farmers.get_mut(uid).ok_or(StorageError::NotFound)?;
        farmer.actual_price = Some(price_per_qtl);
        Ok(farmer.clone())
    }

    async fn move_harvest_week(&self, uid: &str, week: u8) -> Result<FarmerRecord, StorageError> {
        let now = Utc::now();
        let mut tables = self.lock()?;
        let farmer = tables.farmers.get_mut(uid).ok_or(StorageError::NotFound)?;
        let old_key = farmer.calendar_key();
        farmer.harvest_week = week;
        let updated = farmer.clone();
        let new_key = updated.calendar_key();

        if old_key != new_key {
            if let Some(entry) = tables.calendar.get_mut(&old_key) {
                entry.remove_farmer(uid, now);
            }
            tables
                .calendar
                .entry(new_key.clone())
                .or_insert_with(|| CalendarEntry::empty(&new_key, now))
                .add_farmer(uid, now);
        }

        Ok(updated)
    }

    async fn put_buyer(&self, buyer: BuyerRecord) -> Result<(), StorageError> {
        self.lock()?.buyers.insert(buyer.uid.clone(), buyer);
        Ok(())
    }

    async fn get_buyer(&self, uid: &str) -> Result<Option<BuyerRecord>, StorageError> {
        Ok(self.lock()?.buyers.get(uid).cloned())
    }

    async fn put_msp(&self, msp: MspValue) -> Result<(), StorageError> {
        self.lock()?.msp_values.insert(msp.crop.clone(), msp);
        Ok(())
    }

    async fn get_msp(&self, crop: &str) -> Result<Option<MspValue>, StorageError> {
        Ok(self.lock()?.msp_values.get(crop).cloned())
    }

    async fn put_calendar_entry(&self, entry: CalendarEntry) -> Result<(), StorageError> {
        self.lock()?.calendar.insert(entry.key(), entry);
        Ok(())
    }

    async fn calendar_entry(&self, key: &CalendarKey) -> Result<Option<CalendarEntry>, StorageError> {
        Ok(self.lock()?.calendar.get(key).cloned())
    }

    async fn register_harvest(&self, key: &CalendarKey, farmer_uid: &str) -> Result<u32, StorageError> {
        let now = Utc::now();
        let mut tables = self.lock()?;
        let entry = tables
            .calendar
            .entry(key.clone())
            .or_insert_with(|| CalendarEntry::empty(key, now));
        entry.add_farmer(farmer_uid, now);
        Ok(entry.farmer_count)
    }

    async fn unregister_harvest(&self, key: &CalendarKey, farmer_uid: &str) -> Result<u32, StorageError> {
        let mut tables = self.lock()?;
        Ok(tables
            .calendar
            .get_mut(key)
            .map(|entry| {
                entry.remove_farmer(farmer_uid, Utc::now());
                entry.farmer_count
            })
            .unwrap_or(0))
    }

    async fn insert_listing(&self, listing: ListingRecord) -> Result<(), StorageError> {
        let mut tables = self.lock()?;
        if tables.listings.contains_key(&listing.listing_id) {
            return Err(StorageError::Conflict(format!("listing {} exists", listing.listing_id)));
        }
        debug!("Inserted listing {}", listing.listing_id);
        tables.listings.insert(listing.listing_id.clone(), listing);
        Ok(())
    }

    async fn get_listing(&self, listing_id: &str) -> Result<Option<ListingRecord>, StorageError> {
        Ok(self.lock()?.listings.get(listing_id).cloned())
    }

    async fn open_listings(&self, crop: &str) -> Result<Vec<ListingRecord>, StorageError> {
        let tables = self.lock()?;
        let mut listings: Vec<_> = tables
            .listings
            .values()
            .filter(|l| l.crop == crop && l.status == ListingStatus::Open)
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(listings)
    }

    async fn listings_by_buyer(&self, buyer_uid: &str) -> Result<Vec<ListingRecord>, StorageError> {
        let tables = self.lock()?;
        let mut listings: Vec<_> = tables
            .listings
            .values()
            .filter(|l| l.buyer_uid == buyer_uid)
            .cloned()
            .collect();
        listings.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        Ok(listings)
    }

    async fn accept_listing(&self, listing_id: &str, record: MatchRecord) -> Result<MatchRecord, StorageError> {
        let mut tables = self.lock()?;
        let listing = tables.listings.get_mut(listing_id).ok_or(StorageError::NotFound)?;
        if listing.status != ListingStatus::Open {
            return Err(StorageError::Conflict(format!(
                "listing {} is {}",
                listing_id,
                listing.status.as_str()
            )));
        }

        listing.status = ListingStatus::Matched;
        tables.matches.push(record.clone());
        info!("Listing {} matched as {}", listing_id, record.match_id);
        Ok(record)
    }

    async fn matches_by_buyer(&self, buyer_uid: &str) -> Result<Vec<MatchRecord>, StorageError> {
        let tables = self.lock()?;
        Ok(tables.matches.iter().rev().filter(|m| m.buyer_uid == buyer_uid).cloned().collect())
    }

    async fn matches_by_farmer(&self, farmer_uid: &str) -> Result<Vec<MatchRecord>, StorageError> {
        let tables = self.lock()?;
        Ok(tables.matches.iter().rev().filter(|m| m.farmer_uid == farmer_uid).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SoilType;
    use std::sync::Arc;

    fn listing(id: &str, price: u32) -> ListingRecord {
        ListingRecord {
            listing_id: id.to_string(),
            buyer_uid: "buyer_1".to_string(),
            crop: "paddy".to_string(),
            variety: "Sona Masuri".to_string(),
            quantity_qtl: 100,
            target_date: "2024-11-20".to_string(),
            price_per_qtl: price,
            district: "Warangal".to_string(),
            is_below_msp: false,
            status: ListingStatus::Open,
            posted_at: Utc::now(),
        }
    }

    fn farmer(uid: &str) -> FarmerRecord {
        FarmerRecord {
            uid: uid.to_string(),
            crop: "paddy".to_string(),
            variety: "BPT-5204".to_string(),
            sown_date: "2024-09-08".to_string(),
            field_size_acres: 5.0,
            soil_type: SoilType::RedLoam,
            district: "Warangal".to_string(),
            mandal: "Hanamkonda".to_string(),
            expected_qtl: Some(90),
            quantity_confirmed: false,
            viability_days: 18,
            harvest_week: 2,
            status: LifecycleStatus::Growing,
            estimated_price: Some(2100),
            actual_price: None,
        }
    }

    #[tokio::test]
    async fn test_accept_once() {
        let store = MemoryStore::new();
        let open = listing("listing_1", 2300);
        store.insert_listing(open.clone()).await.unwrap();

        let first = MatchRecord::for_listing("farmer_a", &open, Utc::now());
        store.accept_listing("listing_1", first).await.unwrap();

        let second = MatchRecord::for_listing("farmer_b", &open, Utc::now());
        let result = store.accept_listing("listing_1", second).await;
        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(store.match_count(), 1);

        let stored = store.get_listing("listing_1").await.unwrap().unwrap();
        assert_eq!(stored.status, ListingStatus::Matched);
    }

    #[tokio::test]
    async fn test_concurrent_accept_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let open = listing("listing_race", 2300);
        store.insert_listing(open.clone()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let open = open.clone();
            handles.push(tokio::spawn(async move {
                let record = MatchRecord::for_listing(&format!("farmer_{}", i), &open, Utc::now());
                store.accept_listing("listing_race", record).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.match_count(), 1);
    }

    #[tokio::test]
    async fn test_accept_missing_listing() {
        let store = MemoryStore::new();
        let record = MatchRecord::for_listing("farmer_a", &listing("ghost", 2300), Utc::now());
        assert!(matches!(
            store.accept_listing("ghost", record).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_listing_rejected() {
        let store = MemoryStore::new();
        store.insert_listing(listing("dup", 2300)).await.unwrap();
        assert!(matches!(
            store.insert_listing(listing("dup", 2400)).await,
            Err(StorageError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_open_listings_filter() {
        let store = MemoryStore::new();
        store.insert_listing(listing("a", 2300)).await.unwrap();
        let mut cotton = listing("b", 7200);
        cotton.crop = "cotton".to_string();
        store.insert_listing(cotton).await.unwrap();

        let paddy = store.open_listings("paddy").await.unwrap();
        assert_eq!(paddy.len(), 1);
        assert_eq!(paddy[0].listing_id, "a");
    }

    #[tokio::test]
    async fn test_status_compare_and_set() {
        let store = MemoryStore::new();
        store.put_farmer(farmer("f1")).await.unwrap();

        let updated = store
            .set_farmer_status("f1", LifecycleStatus::Growing, LifecycleStatus::Harvested)
            .await
            .unwrap();
        assert_eq!(updated.status, LifecycleStatus::Harvested);

        let stale = store
            .set_farmer_status("f1", LifecycleStatus::Growing, LifecycleStatus::Harvested)
            .await;
        assert!(matches!(stale, Err(StorageError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_move_harvest_week_updates_calendar() {
        let store = MemoryStore::new();
        let f = farmer("f1");
        store.register_harvest(&f.calendar_key(), "f1").await.unwrap();
        store.register_harvest(&f.calendar_key(), "f2").await.unwrap();
        store.put_farmer(f).await.unwrap();

        let moved = store.move_harvest_week("f1", 1).await.unwrap();
        assert_eq!(moved.harvest_week, 1);

        let old = store
            .calendar_entry(&CalendarKey::new("Hanamkonda", "paddy", 2))
            .await
            .unwrap()
            .unwrap();
        let new = store
            .calendar_entry(&CalendarKey::new("Hanamkonda", "paddy", 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(old.farmer_count, 1);
        assert_eq!(new.farmer_count, 1);
        assert_eq!(new.farmer_uids, vec!["f1".to_string()]);
    }

    #[tokio::test]
    async fn test_register_harvest_idempotent() {
        let store = MemoryStore::new();
        let key = CalendarKey::new("Kazipet", "paddy", 3);
        assert_eq!(store.register_harvest(&key, "f1").await.unwrap(), 1);
        assert_eq!(store.register_harvest(&key, "f1").await.unwrap(), 1);
        assert_eq!(store.register_harvest(&key, "f2").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unregister_harvest() {
        let store = MemoryStore::new();
        let key = CalendarKey::new("Kazipet", "paddy", 1);
        store.register_harvest(&key, "f1").await.unwrap();
        store.register_harvest(&key, "f2").await.unwrap();

        assert_eq!(store.unregister_harvest(&key, "f1").await.unwrap(), 1);
        assert_eq!(store.unregister_harvest(&key, "f1").await.unwrap(), 1);
        assert_eq!(
            store
                .unregister_harvest(&CalendarKey::new("Kazipet", "paddy", 2), "f2")
                .await
                .unwrap(),
            0
        );
    }
}
