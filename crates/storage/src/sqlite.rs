//! SQLite repository
//!
//! Each collection is a table holding the record as a JSON `body`, with
//! the fields used for lookups copied into indexed columns.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::{
    BuyerRecord, CalendarEntry, CalendarKey, FarmerRecord, LifecycleStatus, ListingRecord,
    ListingStatus, MatchRecord, MspValue, UserRecord,
};
use crate::{MarketStore, StorageError};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (uid TEXT PRIMARY KEY, body TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS farmers (uid TEXT PRIMARY KEY, body TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS buyers (uid TEXT PRIMARY KEY, body TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS msp_values (crop TEXT PRIMARY KEY, body TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS harvest_calendar (slot TEXT PRIMARY KEY, body TEXT NOT NULL)",
    "CREATE TABLE IF NOT EXISTS buyer_listings (
        listing_id TEXT PRIMARY KEY,
        buyer_uid TEXT NOT NULL,
        crop TEXT NOT NULL,
        status TEXT NOT NULL,
        posted_ms INTEGER NOT NULL,
        body TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_listings_crop_status ON buyer_listings (crop, status)",
    "CREATE INDEX IF NOT EXISTS idx_listings_buyer ON buyer_listings (buyer_uid)",
    "CREATE TABLE IF NOT EXISTS matches (
        match_id TEXT PRIMARY KEY,
        farmer_uid TEXT NOT NULL,
        buyer_uid TEXT NOT NULL,
        listing_id TEXT NOT NULL UNIQUE,
        matched_ms INTEGER NOT NULL,
        body TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_matches_farmer ON matches (farmer_uid)",
    "CREATE INDEX IF NOT EXISTS idx_matches_buyer ON matches (buyer_uid)",
];

fn encode<T: Serialize>(record: &T) -> Result<String, StorageError> {
    Ok(serde_json::to_string(record)?)
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, StorageError> {
    Ok(serde_json::from_str(body)?)
}

fn decode_all<T: DeserializeOwned>(bodies: Vec<String>) -> Result<Vec<T>, StorageError> {
    bodies.iter().map(|b| decode(b)).collect()
}

/// Each connection to an in-memory database sees its own empty database
fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// SQLite-backed repository
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool_options = if is_in_memory(url) {
            info!("Opening in-memory SQLite store on a single connection");
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            info!("Opening SQLite store at {} (max {} connections)", url, max_connections);
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };
        let pool = pool_options.connect_with(options).await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Schema applied");
        Ok(())
    }

    async fn put_doc(&self, table: &str, key_column: &str, key: &str, body: String) -> Result<(), StorageError> {
        let sql = format!(
            "INSERT INTO {table} ({key_column}, body) VALUES (?, ?) \
             ON CONFLICT({key_column}) DO UPDATE SET body = excluded.body"
        );
        sqlx::query(&sql).bind(key).bind(body).execute(&self.pool).await?;
        Ok(())
    }

    async fn get_doc<T: DeserializeOwned>(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<Option<T>, StorageError> {
        let sql = format!("SELECT body FROM {table} WHERE {key_column} = ?");
        let body = sqlx::query_scalar::<_, String>(&sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        body.as_deref().map(decode).transpose()
    }
}

#[async_trait]
impl MarketStore for SqliteStore {
    async fn put_user(&self, user: UserRecord) -> Result<(), StorageError> {
        self.put_doc("users", "uid", &user.uid, encode(&user)?).await
    }

    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StorageError> {
        self.get_doc("users", "uid", uid).await
    }

    async fn put_farmer(&self, farmer: FarmerRecord) -> Result<(), StorageError> {
        self.put_doc("farmers", "uid", &farmer.uid, encode(&farmer)?).await
    }

    async fn get_farmer(&self, uid: &str) -> Result<Option<FarmerRecord>, StorageError> {
        self.get_doc("farmers", "uid", uid).await
    }

    async fn set_farmer_status(
        &self,
        uid: &str,
        from: LifecycleStatus,
        to: LifecycleStatus,
    ) -> Result<FarmerRecord, StorageError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE farmers SET body = json_set(body, '$.status', ?) \
             WHERE uid = ? AND json_extract(body, '$.status') = ?",
        )
        .bind(to.as_str())
        .bind(uid)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await?;
        let body = sqlx::query_scalar::<_, String>("SELECT body FROM farmers WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        let body = body.ok_or(StorageError::NotFound)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(format!(
                "farmer {} is no longer {}",
                uid,
                from.as_str()
            )));
        }
        decode(&body)
    }

    async fn set_actual_price(&self, uid: &str, price_per_qtl: u32) -> Result<FarmerRecord, StorageError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE farmers SET body = json_set(body, '$.actualPrice', ?) WHERE uid = ?")
            .bind(i64::from(price_per_qtl))
            .bind(uid)
            .execute(&mut *tx)
            .await?;
        let body = sqlx::query_scalar::<_, String>("SELECT body FROM farmers WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&mut *tx)
            .await?;
        tx.commit().await?;

        decode(&body.ok_or(StorageError::NotFound)?)
    }

    async fn move_harvest_week(&self, uid: &str, week: u8) -> Result<FarmerRecord, StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let body = sqlx::query_scalar::<_, String>("SELECT body FROM farmers WHERE uid = ?")
            .bind(uid)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StorageError::NotFound)?;
        let mut farmer: FarmerRecord = decode(&body)?;
        let old_key = farmer.calendar_key();
        farmer.harvest_week = week;
        let new_key = farmer.calendar_key();

        sqlx::query("UPDATE farmers SET body = json_set(body, '$.harvestWeek', ?) WHERE uid = ?")
            .bind(i64::from(week))
            .bind(uid)
            .execute(&mut *tx)
            .await?;

        if old_key != new_key {
            for (key, joining) in [(&old_key, false), (&new_key, true)] {
                let existing = sqlx::query_scalar::<_, String>("SELECT body FROM harvest_calendar WHERE slot = ?")
                    .bind(key.doc_id())
                    .fetch_optional(&mut *tx)
                    .await?;
                let mut entry = match existing {
                    Some(body) => decode::<CalendarEntry>(&body)?,
                    None if joining => CalendarEntry::empty(key, now),
                    None => continue,
                };
                let changed = if joining {
                    entry.add_farmer(uid, now)
                } else {
                    entry.remove_farmer(uid, now)
                };
                if changed {
                    sqlx::query(
                        "INSERT INTO harvest_calendar (slot, body) VALUES (?, ?) \
                         ON CONFLICT(slot) DO UPDATE SET body = excluded.body",
                    )
                    .bind(key.doc_id())
                    .bind(encode(&entry)?)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(farmer)
    }

    async fn put_buyer(&self, buyer: BuyerRecord) -> Result<(), StorageError> {
        self.put_doc("buyers", "uid", &buyer.uid, encode(&buyer)?).await
    }

    async fn get_buyer(&self, uid: &str) -> Result<Option<BuyerRecord>, StorageError> {
        self.get_doc("buyers", "uid", uid).await
    }

    async fn put_msp(&self, msp: MspValue) -> Result<(), StorageError> {
        self.put_doc("msp_values", "crop", &msp.crop, encode(&msp)?).await
    }

    async fn get_msp(&self, crop: &str) -> Result<Option<MspValue>, StorageError> {
        self.get_doc("msp_values", "crop", crop).await
    }

    async fn put_calendar_entry(&self, entry: CalendarEntry) -> Result<(), StorageError> {
        self.put_doc("harvest_calendar", "slot", &entry.key().doc_id(), encode(&entry)?)
            .await
    }

    async fn calendar_entry(&self, key: &CalendarKey) -> Result<Option<CalendarEntry>, StorageError> {
        self.get_doc("harvest_calendar", "slot", &key.doc_id()).await
    }

    async fn register_harvest(&self, key: &CalendarKey, farmer_uid: &str) -> Result<u32, StorageError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, String>("SELECT body FROM harvest_calendar WHERE slot = ?")
            .bind(key.doc_id())
            .fetch_optional(&mut *tx)
            .await?;
        let mut entry = match existing {
            Some(body) => decode::<CalendarEntry>(&body)?,
            None => CalendarEntry::empty(key, now),
        };

        if entry.add_farmer(farmer_uid, now) {
            sqlx::query(
                "INSERT INTO harvest_calendar (slot, body) VALUES (?, ?) \
                 ON CONFLICT(slot) DO UPDATE SET body = excluded.body",
            )
            .bind(key.doc_id())
            .bind(encode(&entry)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(entry.farmer_count)
    }

    async fn unregister_harvest(&self, key: &CalendarKey, farmer_uid: &str) -> Result<u32, StorageError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_scalar::<_, String>("SELECT body FROM harvest_calendar WHERE slot = ?")
            .bind(key.doc_id())
            .fetch_optional(&mut *tx)
            .await?;
        let Some(body) = existing else {
            tx.rollback().await?;
            return Ok(0);
        };
        let mut entry: CalendarEntry = decode(&body)?;

        if entry.remove_farmer(farmer_uid, Utc::now()) {
            sqlx::query("UPDATE harvest_calendar SET body = ? WHERE slot = ?")
                .bind(encode(&entry)?)
                .bind(key.doc_id())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(entry.farmer_count)
    }

    async fn insert_listing(&self, listing: ListingRecord) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO buyer_listings (listing_id, buyer_uid, crop, status, posted_ms, body) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&listing.listing_id)
        .bind(&listing.buyer_uid)
        .bind(&listing.crop)
        .bind(listing.status.as_str())
        .bind(listing.posted_at.timestamp_millis())
        .bind(encode(&listing)?)
        .execute(&self.pool)
        .await?;

        debug!("Inserted listing {}", listing.listing_id);
        Ok(())
    }

    async fn get_listing(&self, listing_id: &str) -> Result<Option<ListingRecord>, StorageError> {
        self.get_doc("buyer_listings", "listing_id", listing_id).await
    }

    async fn open_listings(&self, crop: &str) -> Result<Vec<ListingRecord>, StorageError> {
        let bodies = sqlx::query_scalar::<_, String>(
            "SELECT body FROM buyer_listings WHERE crop = ? AND status = 'open' ORDER BY posted_ms DESC",
        )
        .bind(crop)
        .fetch_all(&self.pool)
        .await?;
        decode_all(bodies)
    }

    async fn listings_by_buyer(&self, buyer_uid: &str) -> Result<Vec<ListingRecord>, StorageError> {
        let bodies = sqlx::query_scalar::<_, String>(
            "SELECT body FROM buyer_listings WHERE buyer_uid = ? ORDER BY posted_ms DESC",
        )
        .bind(buyer_uid)
        .fetch_all(&self.pool)
        .await?;
        decode_all(bodies)
    }

    async fn accept_listing(&self, listing_id: &str, record: MatchRecord) -> Result<MatchRecord, StorageError> {
        let mut tx = self.pool.begin().await?;

        let flipped = sqlx::query(
            "UPDATE buyer_listings SET status = ?, body = json_set(body, '$.status', ?) \
             WHERE listing_id = ? AND status = ?",
        )
        .bind(ListingStatus::Matched.as_str())
        .bind(ListingStatus::Matched.as_str())
        .bind(listing_id)
        .bind(ListingStatus::Open.as_str())
        .execute(&mut *tx)
        .await?;

        if flipped.rows_affected() == 0 {
            let status = sqlx::query_scalar::<_, String>("SELECT status FROM buyer_listings WHERE listing_id = ?")
                .bind(listing_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return match status {
                Some(status) => Err(StorageError::Conflict(format!("listing {} is {}", listing_id, status))),
                None => Err(StorageError::NotFound),
            };
        }

        sqlx::query(
            "INSERT INTO matches (match_id, farmer_uid, buyer_uid, listing_id, matched_ms, body) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.match_id)
        .bind(&record.farmer_uid)
        .bind(&record.buyer_uid)
        .bind(&record.listing_id)
        .bind(record.matched_at.timestamp_millis())
        .bind(encode(&record)?)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Listing {} matched as {}", listing_id, record.match_id);
        Ok(record)
    }

    async fn matches_by_buyer(&self, buyer_uid: &str) -> Result<Vec<MatchRecord>, StorageError> {
        let bodies = sqlx::query_scalar::<_, String>(
            "SELECT body FROM matches WHERE buyer_uid = ? ORDER BY matched_ms DESC",
        )
        .bind(buyer_uid)
        .fetch_all(&self.pool)
        .await?;
        decode_all(bodies)
    }

    async fn matches_by_farmer(&self, farmer_uid: &str) -> Result<Vec<MatchRecord>, StorageError> {
        let bodies = sqlx::query_scalar::<_, String>(
            "SELECT body FROM matches WHERE farmer_uid = ? ORDER BY matched_ms DESC",
        )
        .bind(farmer_uid)
        .fetch_all(&self.pool)
        .await?;
        decode_all(bodies)
    }
}
