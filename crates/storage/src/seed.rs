//! Reference and demo data

use chrono::Utc;
use tracing::info;

use crate::models::{
    BuyerRecord, CalendarEntry, CalendarKey, FarmerRecord, Language, LifecycleStatus,
    ListingRecord, ListingStatus, MspValue, Role, SoilType, UserRecord,
};
use crate::{MarketStore, StorageError};

/// Write MSP values; returns how many were written
pub async fn seed_msp(store: &dyn MarketStore, values: &[MspValue]) -> Result<usize, StorageError> {
    for value in values {
        store.put_msp(value.clone()).await?;
    }
    info!("Seeded {} MSP values", values.len());
    Ok(values.len())
}

#[allow(clippy::too_many_arguments)]
fn farmer(
    uid: &str,
    crop: &str,
    variety: &str,
    sown_date: &str,
    acres: f64,
    soil_type: SoilType,
    mandal: &str,
    expected_qtl: u32,
    viability_days: i32,
    harvest_week: u8,
    estimated_price: u32,
) -> FarmerRecord {
    FarmerRecord {
        uid: uid.to_string(),
        crop: crop.to_string(),
        variety: variety.to_string(),
        sown_date: sown_date.to_string(),
        field_size_acres: acres,
        soil_type,
        district: "Warangal".to_string(),
        mandal: mandal.to_string(),
        expected_qtl: Some(expected_qtl),
        quantity_confirmed: false,
        viability_days,
        harvest_week,
        status: LifecycleStatus::Growing,
        estimated_price: Some(estimated_price),
        actual_price: None,
    }
}

fn demo_farmers() -> Vec<FarmerRecord> {
    let mut farmers: Vec<FarmerRecord> = (0..8u32)
        .map(|i| {
            farmer(
                &format!("demo_farmer_w1_{}", i + 1),
                "paddy",
                "Sona Masuri",
                "2024-09-01",
                f64::from(3 + i),
                SoilType::BlackCotton,
                "Warangal Urban",
                (3 + i) * 18,
                10 + i as i32,
                1,
                2100,
            )
        })
        .collect();

    farmers.push(farmer(
        "demo_farmer_w2_1", "paddy", "BPT-5204", "2024-09-08", 5.0, SoilType::RedLoam,
        "Hanamkonda", 90, 18, 2, 2100,
    ));
    farmers.push(farmer(
        "demo_farmer_w2_2", "paddy", "RNR-15048", "2024-09-10", 4.0, SoilType::BlackCotton,
        "Hanamkonda", 72, 20, 2, 2100,
    ));
    farmers.push(farmer(
        "demo_farmer_w3_1", "paddy", "MTU-1010", "2024-09-15", 6.0, SoilType::BlackCotton,
        "Kazipet", 108, 25, 3, 2150,
    ));
    farmers.push(farmer(
        "demo_cotton_emergency", "cotton", "MCU-5", "2024-08-01", 4.0, SoilType::BlackCotton,
        "Warangal Urban", 20, 2, 1, 7200,
    ));
    farmers
}

fn display_name(uid: &str, index: usize) -> String {
    match uid {
        "demo_farmer_w3_1" => "Ravi Kumar".to_string(),
        "demo_cotton_emergency" => "Suresh Cotton".to_string(),
        _ => format!("Farmer {}", index + 1),
    }
}

fn demo_buyers() -> Vec<BuyerRecord> {
    [
        ("demo_buyer_1", "Sri Lakshmi Rice Mills", "Warangal"),
        ("demo_buyer_2", "Kakatiya Cotton Traders", "Warangal"),
        ("demo_buyer_3", "Khammam Chilli Exports", "Khammam"),
    ]
    .iter()
    .enumerate()
    .map(|(i, (uid, name, district))| BuyerRecord {
        uid: uid.to_string(),
        business_name: name.to_string(),
        district: district.to_string(),
        phone: format!("+91920000000{}", i + 1),
    })
    .collect()
}

fn demo_listings() -> Vec<ListingRecord> {
    let now = Utc::now();
    [
        ("listing_paddy_1", "demo_buyer_1", "paddy", "Sona Masuri", 100, "2024-11-20", 2300, "Warangal"),
        ("listing_cotton_1", "demo_buyer_2", "cotton", "MCU-5", 50, "2024-11-25", 7200, "Warangal"),
        ("listing_chilli_1", "demo_buyer_3", "red_chilli", "Teja", 30, "2024-12-01", 8500, "Khammam"),
    ]
    .iter()
    .map(|(id, buyer, crop, variety, qty, target, price, district)| ListingRecord {
        listing_id: id.to_string(),
        buyer_uid: buyer.to_string(),
        crop: crop.to_string(),
        variety: variety.to_string(),
        quantity_qtl: *qty,
        target_date: target.to_string(),
        price_per_qtl: *price,
        district: district.to_string(),
        is_below_msp: false,
        status: ListingStatus::Open,
        posted_at: now,
    })
    .collect()
}

/// Populate a store with the Warangal demo: 12 farmers across four calendar
/// slots (8 / 2 / 1 paddy, one emergency cotton), three buyers and their open
/// listings. Returns the number of farmers written.
pub async fn seed_demo(store: &dyn MarketStore) -> Result<usize, StorageError> {
    let now = Utc::now();
    let farmers = demo_farmers();

    for (i, farmer) in farmers.iter().enumerate() {
        store
            .put_user(UserRecord {
                uid: farmer.uid.clone(),
                name: display_name(&farmer.uid, i),
                phone: format!("+9191000000{:02}", i + 1),
                role: Role::Farmer,
                district: farmer.district.clone(),
                mandal: farmer.mandal.clone(),
                language: Language::Te,
                created_at: now,
            })
            .await?;
        store.put_farmer(farmer.clone()).await?;
    }

    let mut slots: Vec<CalendarEntry> = Vec::new();
    for farmer in &farmers {
        let key: CalendarKey = farmer.calendar_key();
        match slots.iter_mut().find(|s| s.key() == key) {
            Some(slot) => {
                slot.add_farmer(&farmer.uid, now);
            }
            None => {
                let mut slot = CalendarEntry::empty(&key, now);
                slot.add_farmer(&farmer.uid, now);
                slots.push(slot);
            }
        }
    }
    for slot in slots {
        store.put_calendar_entry(slot).await?;
    }

    for buyer in demo_buyers() {
        store
            .put_user(UserRecord {
                uid: buyer.uid.clone(),
                name: buyer.business_name.clone(),
                phone: buyer.phone.clone(),
                role: Role::Buyer,
                district: buyer.district.clone(),
                mandal: buyer.district.clone(),
                language: Language::En,
                created_at: now,
            })
            .await?;
        store.put_buyer(buyer).await?;
    }

    for listing in demo_listings() {
        if store.get_listing(&listing.listing_id).await?.is_none() {
            store.insert_listing(listing).await?;
        }
    }

    info!("Seeded demo data: {} farmers", farmers.len());
    Ok(farmers.len())
}
