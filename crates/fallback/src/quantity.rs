//! Yield Estimator

use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::engine::FallbackEngine;
use crate::lenient;
use crate::text::scale_percent;

const RANGE_LOW_PCT: u32 = 85;
const RANGE_HIGH_PCT: u32 = 115;

/// Yield estimator input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YieldRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(
        rename = "fieldSize_acres",
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_size_acres: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(deserialize_with = "lenient::amount", skip_serializing_if = "Option::is_none")]
    pub district_avg_qtl_per_acre: Option<f64>,
}

/// Yield estimate in quintals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldEstimate {
    #[serde(deserialize_with = "whole_quintals")]
    pub estimated_quintals: u32,
    #[serde(deserialize_with = "whole_quintals")]
    pub range_low: u32,
    #[serde(deserialize_with = "whole_quintals")]
    pub range_high: u32,
    #[serde(default)]
    pub basis: String,
}

/// Accept fractional or negative quintal counts from external sources
fn whole_quintals<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    f64::deserialize(deserializer).map(lenient::whole)
}

impl YieldEstimate {
    /// Whether the estimate lies within its own range
    pub fn is_consistent(&self) -> bool {
        self.range_low <= self.estimated_quintals && self.estimated_quintals <= self.range_high
    }
}

impl FallbackEngine {
    /// Estimate yield from field area and the district average
    pub fn estimate_yield(&self, request: &YieldRequest) -> YieldEstimate {
        let acres = request
            .field_size_acres
            .filter(|acres| *acres > 0.0)
            .unwrap_or(self.config.default_field_acres);
        let per_acre = request
            .district_avg_qtl_per_acre
            .filter(|k| *k > 0.0)
            .unwrap_or(self.config.qtl_per_acre);

        let estimated = (acres * per_acre).round_ties_even().min(f64::from(u32::MAX)) as u32;
        debug!("Yield estimate: {} acres x {} = {} quintals", acres, per_acre, estimated);

        YieldEstimate {
            estimated_quintals: estimated,
            range_low: scale_percent(estimated, RANGE_LOW_PCT),
            range_high: scale_percent(estimated, RANGE_HIGH_PCT),
            basis: format!(
                "District average for {} in {} {}",
                request.variety.as_deref().unwrap_or("your crop"),
                request.district.as_deref().unwrap_or("your district"),
                self.config.season_label
            ),
        }
    }

    /// Fixed response used when the live advisor fails
    pub fn yield_safe_default(&self) -> YieldEstimate {
        YieldEstimate {
            estimated_quintals: 90,
            range_low: 76,
            range_high: 104,
            basis: "District average for Sona Masuri in Warangal Kharif 2024".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_five_acres() {
        let request = YieldRequest {
            field_size_acres: Some(5.0),
            ..Default::default()
        };

        let estimate = FallbackEngine::default().estimate_yield(&request);
        assert_eq!(estimate.estimated_quintals, 90);
        assert_eq!(estimate.range_low, 76);
        assert_eq!(estimate.range_high, 104);
        assert_eq!(estimate.basis, "District average for your crop in your district Kharif 2024");
    }

    #[test]
    fn test_missing_area_uses_default() {
        let engine = FallbackEngine::default();
        let empty = engine.estimate_yield(&YieldRequest::default());
        let zero = engine.estimate_yield(&YieldRequest {
            field_size_acres: Some(0.0),
            ..Default::default()
        });
        assert_eq!(empty.estimated_quintals, 90);
        assert_eq!(zero.estimated_quintals, 90);
    }

    #[test]
    fn test_request_yield_constant() {
        let request = YieldRequest {
            field_size_acres: Some(4.0),
            district_avg_qtl_per_acre: Some(20.0),
            variety: Some("BPT-5204".to_string()),
            district: Some("Warangal".to_string()),
            ..Default::default()
        };

        let estimate = FallbackEngine::default().estimate_yield(&request);
        assert_eq!(estimate.estimated_quintals, 80);
        assert_eq!(estimate.range_low, 68);
        assert_eq!(estimate.range_high, 92);
        assert_eq!(estimate.basis, "District average for BPT-5204 in Warangal Kharif 2024");
    }

    #[test]
    fn test_safe_default_matches_five_acre_estimate() {
        let engine = FallbackEngine::default();
        let computed = engine.estimate_yield(&YieldRequest::default());
        let fixed = engine.yield_safe_default();
        assert_eq!(computed.estimated_quintals, fixed.estimated_quintals);
        assert_eq!(computed.range_low, fixed.range_low);
        assert_eq!(computed.range_high, fixed.range_high);
    }

    #[test]
    fn test_fractional_external_values() {
        let json = r#"{"estimated_quintals": 90.4, "range_low": 76, "range_high": 103.6, "basis": "model"}"#;
        let estimate: YieldEstimate = serde_json::from_str(json).unwrap();
        assert_eq!(estimate.estimated_quintals, 90);
        assert_eq!(estimate.range_high, 104);
        assert!(estimate.is_consistent());

        let inverted = YieldEstimate {
            range_low: 120,
            range_high: 60,
            ..estimate
        };
        assert!(!inverted.is_consistent());
    }

    #[test]
    fn test_request_area_as_text() {
        let request: YieldRequest = serde_json::from_str(r#"{"fieldSize_acres": "5"}"#).unwrap();
        assert_eq!(request.field_size_acres, Some(5.0));
    }

    proptest! {
        #[test]
        fn range_brackets_estimate(acres in 1u32..500) {
            let request = YieldRequest {
                field_size_acres: Some(f64::from(acres)),
                ..Default::default()
            };
            let estimate = FallbackEngine::default().estimate_yield(&request);
            prop_assert_eq!(estimate.estimated_quintals, acres * 18);
            prop_assert!(estimate.range_low <= estimate.estimated_quintals);
            prop_assert!(estimate.range_high >= estimate.estimated_quintals);
        }
    }
}
