//! Crop Reference Data

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Floor used when a crop has no MSP entry (paddy, 2024-25)
pub const DEFAULT_MSP: u32 = 2183;

/// Viability assigned at onboarding when a crop has no entry
pub const DEFAULT_VIABILITY_DAYS: i32 = 14;

/// Minimum Support Price per quintal, keyed by crop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MspTable {
    /// Season the prices apply to
    pub season: String,
    /// Price per quintal by crop key
    pub prices: BTreeMap<String, u32>,
    /// Price used for crops missing from the table
    pub default_price: u32,
}

impl Default for MspTable {
    fn default() -> Self {
        let prices = [
            ("paddy", 2183),
            ("cotton", 7121),
            ("maize", 2225),
            ("turmeric", 7000),
            ("red_chilli", 5500),
        ]
        .into_iter()
        .map(|(crop, price)| (crop.to_string(), price))
        .collect();

        Self {
            season: "2024-25".to_string(),
            prices,
            default_price: DEFAULT_MSP,
        }
    }
}

impl MspTable {
    /// MSP for a crop, falling back to the default floor
    pub fn lookup(&self, crop: &str) -> u32 {
        self.prices.get(crop).copied().unwrap_or(self.default_price)
    }
}

/// Per-crop defaults applied when a farmer onboards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropDefaults {
    /// Shelf-life estimate in days
    pub viability_days: BTreeMap<String, i32>,
}

impl Default for CropDefaults {
    fn default() -> Self {
        let viability_days = [
            ("paddy", 14),
            ("cotton", 21),
            ("maize", 10),
            ("turmeric", 30),
            ("red_chilli", 7),
        ]
        .into_iter()
        .map(|(crop, days)| (crop.to_string(), days))
        .collect();

        Self { viability_days }
    }
}

impl CropDefaults {
    /// Default viability for a crop
    pub fn viability_for(&self, crop: &str) -> i32 {
        self.viability_days
            .get(crop)
            .copied()
            .unwrap_or(DEFAULT_VIABILITY_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msp_lookup() {
        let table = MspTable::default();
        assert_eq!(table.lookup("cotton"), 7121);
        assert_eq!(table.lookup("red_chilli"), 5500);
        assert_eq!(table.lookup("saffron"), DEFAULT_MSP);
    }

    #[test]
    fn test_viability_defaults() {
        let defaults = CropDefaults::default();
        assert_eq!(defaults.viability_for("turmeric"), 30);
        assert_eq!(defaults.viability_for("unknown"), DEFAULT_VIABILITY_DAYS);
    }
}
