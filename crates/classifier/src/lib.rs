//! Coordination Classifiers
//!
//! Maps farmer and market inputs onto status bands and acceptance decisions:
//! viability and supply-pressure banding, the emergency flag, MSP reference
//! data and the MSP gate used when a farmer accepts a buyer listing.

mod band;
mod gate;
mod reference;

pub use band::{Band, Classifier, ThresholdConfig, ThresholdError};
pub use gate::{check_acceptance, RejectReason};
pub use reference::{CropDefaults, MspTable, DEFAULT_MSP, DEFAULT_VIABILITY_DAYS};
