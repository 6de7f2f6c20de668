//! Mandi price history

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::StorageError;

const DEFAULT_CROP: &str = "paddy";
const DEFAULT_APMC: &str = "Warangal";
const DEFAULT_CURRENT_PRICE: u32 = 2100;
const SYNTHETIC_BASE: u32 = 2050;
const SYNTHETIC_SPREAD: u32 = 200;

/// One day's modal price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub price: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct CropHistory {
    #[serde(default)]
    apmc: Option<String>,
    prices: Vec<PricePoint>,
}

/// Price series returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    pub crop: String,
    pub apmc: String,
    pub days: u32,
    pub prices: Vec<PricePoint>,
    pub current_price: u32,
    pub source: &'static str,
}

/// Per-crop price history loaded from the fallback data file
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    crops: HashMap<String, CropHistory>,
}

impl PriceHistory {
    /// History with no data; every series is synthesized
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load `{crop: {apmc, prices: [{date, price}]}}` from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StorageError::DatabaseError(format!("{}: {}", path.display(), e)))?;
        let history = Self::from_json(&raw)?;
        info!("Loaded price history for {} crops from {}", history.crops.len(), path.display());
        Ok(history)
    }

    /// Parse history from JSON text
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        let crops: HashMap<String, CropHistory> = serde_json::from_str(raw)?;
        Ok(Self { crops })
    }

    /// Last `days` points for `crop`, falling back to paddy, then to a synthesized series
    pub fn series(&self, crop: &str, days: u32, today: NaiveDate) -> PriceSeries {
        self.series_with(crop, days, today, &mut rand::thread_rng())
    }

    /// [`PriceHistory::series`] with a caller-supplied RNG
    pub fn series_with<R: Rng>(&self, crop: &str, days: u32, today: NaiveDate, rng: &mut R) -> PriceSeries {
        let history = self
            .crops
            .get(crop)
            .or_else(|| self.crops.get(DEFAULT_CROP))
            .filter(|h| !h.prices.is_empty());

        match history {
            Some(history) => {
                let skip = history.prices.len().saturating_sub(days as usize);
                let prices = history.prices[skip..].to_vec();
                let current_price = prices.last().map(|p| p.price).unwrap_or(DEFAULT_CURRENT_PRICE);
                PriceSeries {
                    crop: crop.to_string(),
                    apmc: history.apmc.clone().unwrap_or_else(|| DEFAULT_APMC.to_string()),
                    days,
                    prices,
                    current_price,
                    source: "fallback",
                }
            }
            None => {
                warn!("No price history for {}, synthesizing {} days", crop, days);
                PriceSeries {
                    crop: crop.to_string(),
                    apmc: DEFAULT_APMC.to_string(),
                    days,
                    prices: synthesize(days, today, rng),
                    current_price: DEFAULT_CURRENT_PRICE,
                    source: "fallback",
                }
            }
        }
    }
}

/// `days` points ending yesterday, each 2050 plus jitter below 200
fn synthesize<R: Rng>(days: u32, today: NaiveDate, rng: &mut R) -> Vec<PricePoint> {
    (0..days)
        .map(|i| {
            let date = today - Duration::days(i64::from(days - i));
            PricePoint {
                date: date.format("%Y-%m-%d").to_string(),
                price: SYNTHETIC_BASE + rng.gen_range(0..SYNTHETIC_SPREAD),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLE: &str = r#"{
        "paddy": {"apmc": "Warangal", "prices": [
            {"date": "2024-11-01", "price": 2080},
            {"date": "2024-11-02", "price": 2095},
            {"date": "2024-11-03", "price": 2110}
        ]},
        "cotton": {"apmc": "Jammikunta", "prices": [
            {"date": "2024-11-03", "price": 7050}
        ]}
    }"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 11).unwrap()
    }

    #[test]
    fn test_last_days() {
        let history = PriceHistory::from_json(SAMPLE).unwrap();
        let series = history.series("paddy", 2, today());

        assert_eq!(series.prices.len(), 2);
        assert_eq!(series.prices[0].date, "2024-11-02");
        assert_eq!(series.current_price, 2110);
        assert_eq!(series.apmc, "Warangal");
        assert_eq!(series.source, "fallback");
    }

    #[test]
    fn test_days_beyond_history() {
        let history = PriceHistory::from_json(SAMPLE).unwrap();
        let series = history.series("paddy", 30, today());
        assert_eq!(series.prices.len(), 3);
        assert_eq!(series.days, 30);
    }

    #[test]
    fn test_unknown_crop_uses_paddy() {
        let history = PriceHistory::from_json(SAMPLE).unwrap();
        let series = history.series("turmeric", 30, today());
        assert_eq!(series.crop, "turmeric");
        assert_eq!(series.apmc, "Warangal");
        assert_eq!(series.current_price, 2110);
    }

    #[test]
    fn test_synthesized_series() {
        let mut rng = StdRng::seed_from_u64(7);
        let series = PriceHistory::empty().series_with("paddy", 5, today(), &mut rng);

        assert_eq!(series.prices.len(), 5);
        assert_eq!(series.prices[0].date, "2024-11-06");
        assert_eq!(series.prices[4].date, "2024-11-10");
        assert!(series.prices.iter().all(|p| (2050..2250).contains(&p.price)));
        assert_eq!(series.current_price, 2100);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            PriceHistory::from_json("not json"),
            Err(StorageError::SerializationError(_))
        ));
    }
}
