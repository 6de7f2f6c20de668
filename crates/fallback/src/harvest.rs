//! Harvest-Window Advisor

use chrono::{Duration, NaiveDate};
use classifier::Band;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::FallbackEngine;
use crate::lenient;
use crate::text::{format_rupees, format_window};

const TELUGU_READY: &str = "మీ పొలంలో పంట సిద్ధంగా ఉంది. సూచించిన వారంలో కోత చేస్తే మంచి ధర పొందవచ్చు. మీ మండలంలో తక్కువ మంది రైతులు ఆ వారంలో కోత చేయడం వల్ల మంచి మార్కెట్ లభిస్తుంది.";
const TELUGU_CROWDED: &str = "మీ మండలంలో ఈ వారం ఎక్కువ మంది రైతులు కోత చేస్తున్నారు. ధరలు తగ్గవచ్చు. సూచించిన వారంలో కోత చేయండి.";
const TELUGU_EMERGENCY: &str = "మీ పంట వెంటనే కోయాలి! ఆలస్యం చేస్తే పూర్తి నష్టం జరుగుతుంది. ఇప్పుడే కోత చేయండి.";
const TELUGU_UNAVAILABLE: &str = "సమాచారం అందుబాటులో లేదు. మంచి వాతావరణంలో కోత చేయండి.";

/// Harvest advisor input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variety: Option<String>,
    #[serde(rename = "sownDate", skip_serializing_if = "Option::is_none")]
    pub sown_date: Option<String>,
    #[serde(
        rename = "fieldSize_acres",
        deserialize_with = "lenient::amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub field_size_acres: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(deserialize_with = "lenient::day_count", skip_serializing_if = "Option::is_none")]
    pub viability_days: Option<i32>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub current_price: Option<u32>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub msp: Option<u32>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub farmer_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Harvest advisor output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestAdvice {
    #[serde(default)]
    pub recommended_window: Option<String>,
    pub emergency_sell: bool,
    #[serde(default)]
    pub reasoning_telugu: String,
    #[serde(default)]
    pub reasoning_english: String,
    #[serde(default)]
    pub price_estimate: Option<String>,
}

impl HarvestAdvice {
    fn emergency() -> Self {
        Self {
            recommended_window: None,
            emergency_sell: true,
            reasoning_telugu: TELUGU_EMERGENCY.to_string(),
            reasoning_english: "Your crop must be harvested now. Waiting risks complete loss."
                .to_string(),
            price_estimate: None,
        }
    }
}

impl FallbackEngine {
    /// Templated harvest recommendation evaluated on `today`
    pub fn harvest(&self, request: &HarvestRequest, today: NaiveDate) -> HarvestAdvice {
        if self.is_emergency(request.viability_days) {
            debug!("Harvest fallback: emergency for viability {:?}", request.viability_days);
            return HarvestAdvice::emergency();
        }

        let supply = request
            .farmer_count
            .map(|count| (count, self.classifier.classify_supply(count)));
        let viability = request
            .viability_days
            .map(|v| (v, self.classifier.classify_viability(v)));

        // Crowded weeks push the window back while the crop stays green
        let delay = match (supply, viability) {
            (Some((_, Band::Red)), Some((v, Band::Green))) => {
                let headroom = v - self.classifier.thresholds().viability_green_above;
                u32::try_from(headroom).unwrap_or(0).min(self.config.max_wait_days)
            }
            _ => 0,
        };

        let start = today + Duration::days(i64::from(self.config.harvest_lead_days + delay));
        let end = start + Duration::days(i64::from(self.config.harvest_window_days.saturating_sub(1)));

        let base = request.current_price.unwrap_or(self.config.default_price);
        let price_estimate = format!(
            "{}–{}/quintal",
            format_rupees(base),
            format_rupees(base.saturating_add(self.config.price_band_width)).trim_start_matches('₹')
        );

        let (reasoning_telugu, reasoning_english) = match supply {
            Some((count, Band::Green)) => (
                TELUGU_READY,
                format!(
                    "Only {} farmers harvest that week — prices will be higher. Weather conditions are favorable. Harvest now to maximize price.",
                    count
                ),
            ),
            Some((count, Band::Yellow)) => (
                TELUGU_READY,
                format!(
                    "{} farmers in your mandal harvest that week — expect moderate competition at the mandi. Harvest within the recommended window.",
                    count
                ),
            ),
            Some((count, Band::Red)) if delay > 0 => (
                TELUGU_CROWDED,
                format!(
                    "{} farmers in your mandal harvest this week — prices may dip. Your crop can wait, so harvest {} days later than usual.",
                    count, delay
                ),
            ),
            Some((count, Band::Red)) => (
                TELUGU_CROWDED,
                format!(
                    "{} farmers in your mandal harvest this week — prices may dip. Sell early in the window before arrivals peak.",
                    count
                ),
            ),
            None => (
                TELUGU_READY,
                "Weather conditions are favorable. Harvest within the recommended window to maximize price."
                    .to_string(),
            ),
        };

        HarvestAdvice {
            recommended_window: Some(format_window(start, end)),
            emergency_sell: false,
            reasoning_telugu: reasoning_telugu.to_string(),
            reasoning_english,
            price_estimate: Some(price_estimate),
        }
    }

    /// Fixed response used when the live advisor fails
    pub fn harvest_safe_default(&self, request: &HarvestRequest) -> HarvestAdvice {
        if self.is_emergency(request.viability_days) {
            return HarvestAdvice::emergency();
        }

        HarvestAdvice {
            recommended_window: Some("This week".to_string()),
            emergency_sell: false,
            reasoning_telugu: TELUGU_UNAVAILABLE.to_string(),
            reasoning_english:
                "Recommendation temporarily unavailable. Harvest when weather is clear.".to_string(),
            price_estimate: None,
        }
    }

    /// Force the emergency shape onto an externally produced recommendation
    pub fn enforce_harvest(&self, request: &HarvestRequest, advice: HarvestAdvice) -> HarvestAdvice {
        if !self.is_emergency(request.viability_days) {
            return advice;
        }
        if advice.emergency_sell && advice.recommended_window.is_none() && advice.price_estimate.is_none() {
            return advice;
        }

        debug!("Overriding harvest advice with emergency for viability {:?}", request.viability_days);
        HarvestAdvice {
            recommended_window: None,
            emergency_sell: true,
            price_estimate: None,
            ..advice
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nov_11() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, 11).unwrap()
    }

    #[test]
    fn test_emergency_window_is_empty() {
        let engine = FallbackEngine::default();
        let request = HarvestRequest {
            viability_days: Some(2),
            ..Default::default()
        };

        let advice = engine.harvest(&request, nov_11());
        assert!(advice.emergency_sell);
        assert_eq!(advice.recommended_window, None);
        assert_eq!(advice.price_estimate, None);
    }

    #[test]
    fn test_fractional_viability_stays_emergency() {
        let json = r#"{"viability_days": 2.9, "current_price": 2250.5, "farmer_count": "3"}"#;
        let request: HarvestRequest = serde_json::from_str(json).unwrap();

        assert_eq!(request.viability_days, Some(2));
        assert_eq!(request.current_price, Some(2250));
        assert_eq!(request.farmer_count, Some(3));
        assert!(FallbackEngine::default().harvest(&request, nov_11()).emergency_sell);
    }

    #[test]
    fn test_low_pressure_window() {
        let engine = FallbackEngine::default();
        let request = HarvestRequest {
            viability_days: Some(10),
            farmer_count: Some(2),
            ..Default::default()
        };

        let advice = engine.harvest(&request, nov_11());
        assert!(!advice.emergency_sell);
        assert_eq!(advice.recommended_window.as_deref(), Some("Nov 14–18"));
        assert_eq!(advice.price_estimate.as_deref(), Some("₹2,100–2,300/quintal"));
        assert!(advice.reasoning_english.starts_with("Only 2 farmers"));
    }

    #[test]
    fn test_crowded_week_delays_green_crop() {
        let engine = FallbackEngine::default();
        let request = HarvestRequest {
            viability_days: Some(12),
            farmer_count: Some(8),
            current_price: Some(2200),
            ..Default::default()
        };

        let advice = engine.harvest(&request, nov_11());
        // 5 days of headroom above the green bound
        assert_eq!(advice.recommended_window.as_deref(), Some("Nov 19–23"));
        assert_eq!(advice.price_estimate.as_deref(), Some("₹2,200–2,400/quintal"));
    }

    #[test]
    fn test_safe_default() {
        let engine = FallbackEngine::default();

        let normal = engine.harvest_safe_default(&HarvestRequest::default());
        assert_eq!(normal.recommended_window.as_deref(), Some("This week"));
        assert_eq!(normal.price_estimate, None);

        let urgent = engine.harvest_safe_default(&HarvestRequest {
            viability_days: Some(1),
            ..Default::default()
        });
        assert!(urgent.emergency_sell);
    }

    #[test]
    fn test_enforce_overrides_live_window() {
        let engine = FallbackEngine::default();
        let request = HarvestRequest {
            viability_days: Some(0),
            ..Default::default()
        };
        let live = HarvestAdvice {
            recommended_window: Some("Next week".to_string()),
            emergency_sell: false,
            reasoning_telugu: String::new(),
            reasoning_english: "Wait for better prices".to_string(),
            price_estimate: Some("₹2,000".to_string()),
        };

        let advice = engine.enforce_harvest(&request, live);
        assert!(advice.emergency_sell);
        assert_eq!(advice.recommended_window, None);
        assert_eq!(advice.reasoning_english, "Wait for better prices");
    }

    #[test]
    fn test_emergency_serializes_nulls() {
        let advice = FallbackEngine::default().harvest(
            &HarvestRequest {
                viability_days: Some(2),
                ..Default::default()
            },
            nov_11(),
        );
        let json = serde_json::to_value(&advice).unwrap();
        assert!(json["recommended_window"].is_null());
        assert!(json["price_estimate"].is_null());
        assert_eq!(json["emergency_sell"], true);
    }
}
