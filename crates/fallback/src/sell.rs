//! Sell/Wait Advisor

use classifier::Band;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::FallbackEngine;
use crate::lenient;
use crate::text::capitalize;

const TELUGU_SELL: &str = "వాతావరణం అనుకూలంగా ఉంది. కొనుగోలుదారు మంచి ధర ఇస్తున్నారు. ఇప్పుడు అమ్మడం లాభకరం.";
const TELUGU_WAIT: &str = "ఈ వారం మీ మండలంలో ఎక్కువ మంది రైతులు అమ్ముతున్నారు. కొన్ని రోజులు ఆగితే మంచి ధర వస్తుంది.";

/// A buyer offer already matched to the farmer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuyerOffer {
    #[serde(default)]
    pub exists: bool,
    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub price: Option<u32>,
}

/// Sell/wait advisor input
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SellRequest {
    #[serde(deserialize_with = "lenient::day_count", skip_serializing_if = "Option::is_none")]
    pub viability_days: Option<i32>,
    #[serde(deserialize_with = "lenient::flag", skip_serializing_if = "Option::is_none")]
    pub rain_in_3_days: Option<bool>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub current_price: Option<u32>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub msp: Option<u32>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub farmer_count_this_week: Option<u32>,
    #[serde(deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub storage_capacity_pct: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_availability: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_buyer_offer: Option<BuyerOffer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SellRequest {
    /// Conditions behind the advisor's standing "sell now" answer
    pub fn reference_case() -> Self {
        Self {
            viability_days: Some(10),
            rain_in_3_days: Some(false),
            current_price: Some(2300),
            msp: Some(2183),
            farmer_count_this_week: Some(2),
            storage_capacity_pct: Some(70),
            transport_availability: Some("medium".to_string()),
            matched_buyer_offer: Some(BuyerOffer {
                exists: true,
                price: Some(2300),
            }),
            language: None,
        }
    }
}

/// One row of the seven-factor breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorStatus {
    pub factor: String,
    pub status: String,
    pub impact: String,
}

impl FactorStatus {
    fn new(factor: &str, status: impl Into<String>, impact: &str) -> Self {
        Self {
            factor: factor.to_string(),
            status: status.into(),
            impact: impact.to_string(),
        }
    }
}

/// Sell/wait decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellDecision {
    SellNow,
    Wait(u32),
    Emergency,
}

impl SellDecision {
    /// Wire label
    pub fn label(&self) -> String {
        match self {
            SellDecision::SellNow => "Sell Now".to_string(),
            SellDecision::Wait(days) => format!("Wait {} days", days),
            SellDecision::Emergency => "Emergency: Sell Immediately".to_string(),
        }
    }

    /// Days to wait, if any
    pub fn wait_days(&self) -> Option<u32> {
        match self {
            SellDecision::Wait(days) => Some(*days),
            _ => None,
        }
    }
}

/// Sell/wait advisor output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellAdvice {
    pub decision: String,
    #[serde(default)]
    pub wait_days: Option<u32>,
    #[serde(default)]
    pub factor_breakdown: Vec<FactorStatus>,
    #[serde(default)]
    pub reasoning_telugu: String,
    #[serde(default)]
    pub reasoning_english: String,
}

impl FallbackEngine {
    /// Decide sell/wait/emergency from the request
    pub fn decide_sell(&self, request: &SellRequest) -> SellDecision {
        let Some(viability) = request.viability_days else {
            return SellDecision::SellNow;
        };
        if self.classifier.is_emergency(viability) {
            return SellDecision::Emergency;
        }

        let supply = request
            .farmer_count_this_week
            .map(|count| self.classifier.classify_supply(count));
        if supply == Some(Band::Red) && self.classifier.classify_viability(viability) == Band::Green {
            let headroom = viability - self.classifier.thresholds().viability_green_above;
            let days = u32::try_from(headroom).unwrap_or(1).clamp(1, self.config.max_wait_days.max(1));
            return SellDecision::Wait(days);
        }

        SellDecision::SellNow
    }

    /// Templated sell/wait recommendation over the seven factors
    pub fn sell(&self, request: &SellRequest) -> SellAdvice {
        let decision = self.decide_sell(request);
        debug!("Sell fallback decision: {}", decision.label());

        if decision == SellDecision::Emergency {
            return self.emergency_sell(request.viability_days.unwrap_or(0));
        }

        let factor_breakdown = self.evaluate_factors(request);
        let (reasoning_telugu, reasoning_english) = match decision {
            SellDecision::Wait(days) => (
                TELUGU_WAIT,
                format!(
                    "{} farmers in your mandal are selling this week, which pushes prices down. Your crop stays viable for {} days, so waiting {} days is safe.",
                    request.farmer_count_this_week.unwrap_or(0),
                    request.viability_days.unwrap_or(0),
                    days
                ),
            ),
            _ => (TELUGU_SELL, self.sell_now_reasoning(request)),
        };

        SellAdvice {
            decision: decision.label(),
            wait_days: decision.wait_days(),
            factor_breakdown,
            reasoning_telugu: reasoning_telugu.to_string(),
            reasoning_english,
        }
    }

    /// Fixed response used when the live advisor fails
    pub fn sell_safe_default(&self, request: &SellRequest) -> SellAdvice {
        match request.viability_days {
            Some(v) if self.classifier.is_emergency(v) => self.emergency_sell(v),
            _ => self.sell(&SellRequest::reference_case()),
        }
    }

    /// Force the emergency decision onto an externally produced recommendation
    pub fn enforce_sell(&self, request: &SellRequest, advice: SellAdvice) -> SellAdvice {
        match request.viability_days {
            Some(v) if self.classifier.is_emergency(v) => {
                let label = SellDecision::Emergency.label();
                if advice.decision == label && advice.wait_days.is_none() {
                    return advice;
                }
                debug!("Overriding sell decision '{}' with emergency", advice.decision);
                SellAdvice {
                    decision: label,
                    wait_days: None,
                    ..advice
                }
            }
            _ => advice,
        }
    }

    fn emergency_sell(&self, viability_days: i32) -> SellAdvice {
        let days = viability_days.max(0);
        let factor_breakdown = vec![
            FactorStatus::new("Crop Viability", format!("{} days — CRITICAL", days), "sell immediately"),
            FactorStatus::new("Weather", "Rain expected", "harvest now"),
            FactorStatus::new("Price vs MSP", "Any price — accept", "avoid total loss"),
            FactorStatus::new("Supply Pressure", "Emergency override", "sell immediately"),
            FactorStatus::new("Storage", "No time to store", "sell immediately"),
            FactorStatus::new("Transport", "Arrange urgently", "sell immediately"),
            FactorStatus::new("Buyer Demand", "Take any offer", "sell immediately"),
        ];

        SellAdvice {
            decision: SellDecision::Emergency.label(),
            wait_days: None,
            factor_breakdown,
            reasoning_telugu: format!(
                "మీ పంట {} రోజుల్లో పాడవుతుంది! వెంటనే అమ్మండి. ఆలస్యం చేస్తే పూర్తి నష్టం జరుగుతుంది.",
                days
            ),
            reasoning_english: format!(
                "EMERGENCY: Your crop will spoil in {} days. Sell immediately at any available price to avoid total loss.",
                days
            ),
        }
    }

    fn evaluate_factors(&self, request: &SellRequest) -> Vec<FactorStatus> {
        let viability = match request.viability_days {
            Some(v) => match self.classifier.classify_viability(v) {
                Band::Green => FactorStatus::new("Crop Viability", format!("{} days — OK", v), "none"),
                Band::Yellow => FactorStatus::new("Crop Viability", format!("{} days — LOW", v), "sell soon"),
                Band::Red => FactorStatus::new("Crop Viability", format!("{} days — CRITICAL", v), "sell immediately"),
            },
            None => FactorStatus::new("Crop Viability", "Not reported", "none"),
        };

        let weather = if request.rain_in_3_days == Some(true) {
            FactorStatus::new("Weather", "Rain expected", "harvest before rain")
        } else {
            FactorStatus::new("Weather", "Clear for 3 days", "none")
        };

        let price = match (request.current_price, request.msp) {
            (Some(current), Some(msp)) if current >= msp => {
                FactorStatus::new("Price vs MSP", "Above MSP — GOOD", "none")
            }
            (Some(_), Some(_)) => FactorStatus::new("Price vs MSP", "Below MSP — WEAK", "hold if possible"),
            _ => FactorStatus::new("Price vs MSP", "No price data", "none"),
        };

        let supply = match request.farmer_count_this_week {
            Some(count) => {
                let band = self.classifier.classify_supply(count);
                let impact = match band {
                    Band::Green => "none",
                    Band::Yellow => "expect competition",
                    Band::Red => "wait for prices to recover",
                };
                FactorStatus::new(
                    "Supply Pressure",
                    format!("{} farmers — {}", count, band.pressure_label()),
                    impact,
                )
            }
            None => FactorStatus::new("Supply Pressure", "Not reported", "none"),
        };

        let storage = match request.storage_capacity_pct {
            Some(pct) if pct >= self.config.storage_full_pct => {
                FactorStatus::new("Storage", format!("{}% full — FULL", pct), "sell to free space")
            }
            Some(pct) => FactorStatus::new("Storage", format!("{}% full — OK", pct), "none"),
            None => FactorStatus::new("Storage", "Not reported", "none"),
        };

        let transport = match request.transport_availability.as_deref() {
            Some(level) => {
                let impact = match level {
                    "low" => "book early",
                    "high" => "none",
                    _ => "act soon",
                };
                FactorStatus::new("Transport", format!("{} availability", capitalize(level)), impact)
            }
            None => FactorStatus::new("Transport", "Not reported", "none"),
        };

        let demand = match &request.matched_buyer_offer {
            Some(BuyerOffer {
                exists: true,
                price: Some(offer),
            }) => {
                if request.msp.map_or(true, |msp| *offer >= msp) {
                    FactorStatus::new("Buyer Demand", format!("Matched offer ₹{} — GOOD", offer), "accept offer")
                } else {
                    FactorStatus::new("Buyer Demand", format!("Matched offer ₹{} — BELOW MSP", offer), "negotiate")
                }
            }
            Some(BuyerOffer { exists: true, .. }) => {
                FactorStatus::new("Buyer Demand", "Matched offer", "review offer")
            }
            _ => FactorStatus::new("Buyer Demand", "No matched offer", "list on marketplace"),
        };

        vec![viability, weather, price, supply, storage, transport, demand]
    }

    fn sell_now_reasoning(&self, request: &SellRequest) -> String {
        let mut sentences = Vec::new();

        if request.rain_in_3_days == Some(true) {
            sentences.push("Rain is expected within 3 days.".to_string());
        } else {
            sentences.push("Weather is clear for 3 days.".to_string());
        }

        match (&request.matched_buyer_offer, request.msp) {
            (Some(BuyerOffer { exists: true, price: Some(offer) }), Some(msp)) if *offer >= msp => {
                sentences.push(format!("A matched buyer offers ₹{} which is above MSP.", offer));
            }
            (Some(BuyerOffer { exists: true, price: Some(offer) }), _) => {
                sentences.push(format!("A matched buyer offers ₹{}.", offer));
            }
            _ => {}
        }

        sentences.push("Recommend selling now.".to_string());
        sentences.join(" ")
    }
}
