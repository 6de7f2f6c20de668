//! Lenient field readers for advisory requests
//!
//! Farmer apps send prices as `2250.5`, counts as `"12"` and flags as `1`.
//! These readers accept such values instead of rejecting the whole body;
//! anything unreadable becomes `None`.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer};

/// The viability reading alone, for bodies whose other fields do not parse
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ViabilityHint {
    #[serde(deserialize_with = "day_count")]
    pub viability_days: Option<i32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Flag(bool),
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl Loose {
    fn number(&self) -> Option<f64> {
        let value = match self {
            Loose::Number(n) => Some(*n),
            Loose::Text(s) => s.trim().parse().ok(),
            Loose::Flag(_) | Loose::Other(_) => None,
        };
        value.filter(|n| n.is_finite())
    }

    fn flag(&self) -> Option<bool> {
        match self {
            Loose::Flag(b) => Some(*b),
            Loose::Number(n) => Some(*n != 0.0),
            Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            Loose::Other(_) => None,
        }
    }
}

/// Round to a whole non-negative count, ties to even
pub(crate) fn whole(value: f64) -> u32 {
    value.max(0.0).round_ties_even().min(f64::from(u32::MAX)) as u32
}

/// Whole days, rounded down so a fraction under the emergency bound stays under it
pub(crate) fn days(value: f64) -> i32 {
    value.floor().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

pub(crate) fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Loose::number).map(whole))
}

pub(crate) fn day_count<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Loose::number).map(days))
}

pub(crate) fn amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Loose::number))
}

pub(crate) fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Loose::flag))
}
