//! MSP Gate for Listing Acceptance

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Why a farmer could not accept a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// Offer is under the crop's Minimum Support Price
    BelowMsp,
    /// Listing is no longer open
    NotAvailable,
}

impl RejectReason {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::BelowMsp => "below_msp",
            RejectReason::NotAvailable => "not_available",
        }
    }

    /// Human-readable explanation
    pub fn message(&self, crop: &str, msp: u32) -> String {
        match self {
            RejectReason::BelowMsp => {
                format!("This offer is below the MSP of ₹{}/quintal for {}.", msp, crop)
            }
            RejectReason::NotAvailable => "This listing is no longer available.".to_string(),
        }
    }
}

/// Decide whether a listing may be accepted.
///
/// The MSP floor is checked before availability, so a below-MSP listing is
/// always reported as `below_msp` whatever its status.
pub fn check_acceptance(price_per_qtl: u32, msp: u32, is_open: bool) -> Result<(), RejectReason> {
    if price_per_qtl < msp {
        debug!("Listing price {} below MSP {}", price_per_qtl, msp);
        return Err(RejectReason::BelowMsp);
    }
    if !is_open {
        return Err(RejectReason::NotAvailable);
    }
    Ok(())
}
