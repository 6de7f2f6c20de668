//! Storage Layer
//!
//! Marketplace persistence behind the [`MarketStore`] trait, with an
//! in-memory repository and a SQLite repository storing JSON documents.

mod memory;
mod models;
mod prices;
mod seed;
mod sqlite;

pub use memory::MemoryStore;
pub use models::{
    BuyerRecord, CalendarEntry, CalendarKey, FarmerRecord, Language, LifecycleStatus,
    ListingRecord, ListingStatus, MatchRecord, MspValue, Role, SoilType, UserRecord,
};
pub use prices::{PriceHistory, PricePoint, PriceSeries};
pub use seed::{seed_demo, seed_msp};
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Record not found")]
    NotFound,
    #[error("Conflicting update: {0}")]
    Conflict(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StorageError::Conflict(db.message().to_string())
            }
            other => StorageError::DatabaseError(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::SerializationError(err.to_string())
    }
}

/// Document store for the marketplace collections
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// Create or replace a user
    async fn put_user(&self, user: UserRecord) -> Result<(), StorageError>;
    /// Get a user by uid
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StorageError>;

    /// Create or replace a farmer profile
    async fn put_farmer(&self, farmer: FarmerRecord) -> Result<(), StorageError>;
    /// Get a farmer profile by uid
    async fn get_farmer(&self, uid: &str) -> Result<Option<FarmerRecord>, StorageError>;
    /// Move a farmer from `from` to `to`; `Conflict` if the status has changed
    async fn set_farmer_status(
        &self,
        uid: &str,
        from: LifecycleStatus,
        to: LifecycleStatus,
    ) -> Result<FarmerRecord, StorageError>;
    /// Record the price a farmer actually sold at
    async fn set_actual_price(&self, uid: &str, price_per_qtl: u32) -> Result<FarmerRecord, StorageError>;
    /// Move a farmer to another harvest week, keeping calendar slots in step
    async fn move_harvest_week(&self, uid: &str, week: u8) -> Result<FarmerRecord, StorageError>;

    /// Create or replace a buyer profile
    async fn put_buyer(&self, buyer: BuyerRecord) -> Result<(), StorageError>;
    /// Get a buyer profile by uid
    async fn get_buyer(&self, uid: &str) -> Result<Option<BuyerRecord>, StorageError>;

    /// Create or replace an MSP value
    async fn put_msp(&self, msp: MspValue) -> Result<(), StorageError>;
    /// Get the MSP value for a crop
    async fn get_msp(&self, crop: &str) -> Result<Option<MspValue>, StorageError>;

    /// Create or replace a calendar slot
    async fn put_calendar_entry(&self, entry: CalendarEntry) -> Result<(), StorageError>;
    /// Get a calendar slot
    async fn calendar_entry(&self, key: &CalendarKey) -> Result<Option<CalendarEntry>, StorageError>;
    /// Add a farmer to a calendar slot; returns the slot's farmer count
    async fn register_harvest(&self, key: &CalendarKey, farmer_uid: &str) -> Result<u32, StorageError>;
    /// Remove a farmer from a calendar slot; returns the slot's farmer count
    async fn unregister_harvest(&self, key: &CalendarKey, farmer_uid: &str) -> Result<u32, StorageError>;

    /// Insert a new listing; `Conflict` if the id exists
    async fn insert_listing(&self, listing: ListingRecord) -> Result<(), StorageError>;
    /// Get a listing by id
    async fn get_listing(&self, listing_id: &str) -> Result<Option<ListingRecord>, StorageError>;
    /// Open listings for a crop
    async fn open_listings(&self, crop: &str) -> Result<Vec<ListingRecord>, StorageError>;
    /// Listings posted by a buyer
    async fn listings_by_buyer(&self, buyer_uid: &str) -> Result<Vec<ListingRecord>, StorageError>;

    /// Flip an open listing to matched and record the match, atomically.
    ///
    /// `NotFound` if the listing is absent, `Conflict` if it is no longer open;
    /// in both cases no match is written.
    async fn accept_listing(&self, listing_id: &str, record: MatchRecord) -> Result<MatchRecord, StorageError>;
    /// Matches for a buyer
    async fn matches_by_buyer(&self, buyer_uid: &str) -> Result<Vec<MatchRecord>, StorageError>;
    /// Matches for a farmer
    async fn matches_by_farmer(&self, farmer_uid: &str) -> Result<Vec<MatchRecord>, StorageError>;
}
