//! Fallback Engine

use classifier::Classifier;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fallback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Days from the evaluation date to the start of the harvest window
    pub harvest_lead_days: u32,
    /// Length of the recommended harvest window in days
    pub harvest_window_days: u32,
    /// Mandi price assumed when the request carries none (₹/quintal)
    pub default_price: u32,
    /// Width of the quoted price range (₹/quintal)
    pub price_band_width: u32,
    /// Upper bound on a "wait N days" recommendation
    pub max_wait_days: u32,
    /// Storage occupancy at which selling frees space (%)
    pub storage_full_pct: u32,
    /// Field size assumed when the request carries none (acres)
    pub default_field_acres: f64,
    /// District average yield (quintals per acre)
    pub qtl_per_acre: f64,
    /// Season named in the yield basis text
    pub season_label: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            harvest_lead_days: 3,
            harvest_window_days: 5,
            default_price: 2100,
            price_band_width: 200,
            max_wait_days: 7,
            storage_full_pct: 90,
            default_field_acres: 5.0,
            qtl_per_acre: 18.0,
            season_label: "Kharif 2024".to_string(),
        }
    }
}

/// Rule-based recommendation engine
#[derive(Debug, Clone, Default)]
pub struct FallbackEngine {
    pub(crate) config: FallbackConfig,
    pub(crate) classifier: Classifier,
}

impl FallbackEngine {
    /// Create a new fallback engine
    pub fn new(config: FallbackConfig, classifier: Classifier) -> Self {
        info!("Creating fallback engine with config: {:?}", config);
        Self { config, classifier }
    }

    pub(crate) fn is_emergency(&self, viability_days: Option<i32>) -> bool {
        viability_days.is_some_and(|v| self.classifier.is_emergency(v))
    }
}
