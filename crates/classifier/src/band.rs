//! Viability and Supply-Pressure Banding

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Ordinal status band shared by the viability and supply classifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Green,
    Yellow,
    Red,
}

impl Band {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Green => "green",
            Band::Yellow => "yellow",
            Band::Red => "red",
        }
    }

    /// Pressure wording used in advisory text
    pub fn pressure_label(&self) -> &'static str {
        match self {
            Band::Green => "LOW",
            Band::Yellow => "MEDIUM",
            Band::Red => "HIGH",
        }
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("viability red bound {red_below} must not exceed green bound {green_above} + 1")]
    ViabilityBounds { red_below: i32, green_above: i32 },
    #[error("supply yellow bound {yellow_at} must not exceed red bound {red_at}")]
    SupplyBounds { yellow_at: u32, red_at: u32 },
}

/// Band thresholds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Viability strictly above this is green (default: 7)
    pub viability_green_above: i32,
    /// Viability strictly below this is red and raises the emergency flag (default: 3)
    pub viability_red_below: i32,
    /// Farmer count at or above this is yellow (default: 3)
    pub supply_yellow_at: u32,
    /// Farmer count at or above this is red (default: 5)
    pub supply_red_at: u32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            viability_green_above: 7,
            viability_red_below: 3,
            supply_yellow_at: 3,
            supply_red_at: 5,
        }
    }
}

impl ThresholdConfig {
    /// Check that the bands are ordered
    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.viability_red_below > self.viability_green_above + 1 {
            return Err(ThresholdError::ViabilityBounds {
                red_below: self.viability_red_below,
                green_above: self.viability_green_above,
            });
        }
        if self.supply_yellow_at > self.supply_red_at {
            return Err(ThresholdError::SupplyBounds {
                yellow_at: self.supply_yellow_at,
                red_at: self.supply_red_at,
            });
        }
        Ok(())
    }
}

/// Classifier applying the configured thresholds
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ThresholdConfig,
}

impl Classifier {
    /// Create a new classifier
    pub fn new(config: ThresholdConfig) -> Result<Self, ThresholdError> {
        config.validate()?;
        info!("Creating classifier with thresholds: {:?}", config);
        Ok(Self { config })
    }

    /// Band for the remaining viability days
    pub fn classify_viability(&self, viability_days: i32) -> Band {
        if viability_days > self.config.viability_green_above {
            Band::Green
        } else if viability_days >= self.config.viability_red_below {
            Band::Yellow
        } else {
            Band::Red
        }
    }

    /// Band for the number of farmers harvesting in one (mandal, crop, week) slot
    pub fn classify_supply(&self, farmer_count: u32) -> Band {
        let band = if farmer_count >= self.config.supply_red_at {
            Band::Red
        } else if farmer_count >= self.config.supply_yellow_at {
            Band::Yellow
        } else {
            Band::Green
        };
        debug!("Supply pressure for {} farmers: {}", farmer_count, band);
        band
    }

    /// Whether the crop must be sold immediately
    pub fn is_emergency(&self, viability_days: i32) -> bool {
        self.classify_viability(viability_days) == Band::Red
    }

    /// Get the active thresholds
    pub fn thresholds(&self) -> &ThresholdConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_viability_boundaries() {
        let classifier = Classifier::default();

        assert_eq!(classifier.classify_viability(2), Band::Red);
        assert_eq!(classifier.classify_viability(3), Band::Yellow);
        assert_eq!(classifier.classify_viability(7), Band::Yellow);
        assert_eq!(classifier.classify_viability(8), Band::Green);
        assert_eq!(classifier.classify_viability(-1), Band::Red);
    }

    #[test]
    fn test_supply_boundaries() {
        let classifier = Classifier::default();

        assert_eq!(classifier.classify_supply(0), Band::Green);
        assert_eq!(classifier.classify_supply(2), Band::Green);
        assert_eq!(classifier.classify_supply(3), Band::Yellow);
        assert_eq!(classifier.classify_supply(4), Band::Yellow);
        assert_eq!(classifier.classify_supply(5), Band::Red);
        assert_eq!(classifier.classify_supply(8), Band::Red);
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = Classifier::new(ThresholdConfig {
            supply_yellow_at: 10,
            supply_red_at: 20,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(classifier.classify_supply(9), Band::Green);
        assert_eq!(classifier.classify_supply(10), Band::Yellow);
        assert_eq!(classifier.classify_supply(20), Band::Red);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let result = Classifier::new(ThresholdConfig {
            supply_yellow_at: 6,
            supply_red_at: 5,
            ..Default::default()
        });
        assert!(matches!(result, Err(ThresholdError::SupplyBounds { .. })));
    }

    #[test]
    fn test_band_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Band::Yellow).unwrap(), "\"yellow\"");
        assert!(Band::Red > Band::Yellow && Band::Yellow > Band::Green);
    }

    proptest! {
        #[test]
        fn viability_band_matches_thresholds(v in -1000i32..1000) {
            let band = Classifier::default().classify_viability(v);
            prop_assert_eq!(band == Band::Red, v < 3);
            prop_assert_eq!(band == Band::Yellow, (3..=7).contains(&v));
            prop_assert_eq!(band == Band::Green, v > 7);
        }

        #[test]
        fn supply_band_matches_thresholds(c in 0u32..10_000) {
            let band = Classifier::default().classify_supply(c);
            prop_assert_eq!(band == Band::Red, c >= 5);
            prop_assert_eq!(band == Band::Yellow, (3..5).contains(&c));
            prop_assert_eq!(band == Band::Green, c < 3);
        }

        #[test]
        fn emergency_iff_red_viability(v in -1000i32..1000) {
            prop_assert_eq!(Classifier::default().is_emergency(v), v < 3);
        }
    }
}
