//! Field Validator

use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Price per quintal valid range (₹)
    pub price_range: (f64, f64),
    /// Quantity valid range (quintals)
    pub quantity_range: (f64, f64),
    /// Field size valid range (acres)
    pub acres_range: (f64, f64),
    /// Harvest week valid range
    pub harvest_week_range: (f64, f64),
    /// Price history window valid range (days)
    pub days_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            price_range: (1.0, 1_000_000.0),
            quantity_range: (1.0, 1_000_000.0),
            acres_range: (0.0, 10_000.0),
            harvest_week_range: (1.0, 3.0),
            days_range: (1.0, 365.0),
        }
    }
}

/// Result of checking several fields at once
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// List of validation errors
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Collect individual checks
    pub fn from_checks(checks: Vec<Result<(), ValidationError>>) -> Self {
        Self {
            errors: checks.into_iter().filter_map(Result::err).collect(),
        }
    }

    /// First error, if any
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Validator for marketplace request fields
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Fail with every field whose `present` flag is false
    pub fn require(&self, fields: &[(&'static str, bool)]) -> Result<(), ValidationError> {
        let missing: Vec<_> = fields
            .iter()
            .filter(|(_, present)| !present)
            .map(|(name, _)| *name)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            debug!("Missing fields: {:?}", missing);
            Err(ValidationError::MissingFields(missing))
        }
    }

    /// Whether an optional string carries non-blank text
    pub fn present(value: Option<&str>) -> bool {
        value.map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() || value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    fn whole_number(&self, field: &'static str, value: f64, range: (f64, f64)) -> Result<u32, ValidationError> {
        self.validate_range(field, value, range)?;
        if value.fract() != 0.0 {
            return Err(ValidationError::InvalidFormat(format!("{} must be a whole number", field)));
        }
        Ok(value as u32)
    }

    /// Validate a price per quintal
    pub fn validate_price(&self, field: &'static str, value: f64) -> Result<u32, ValidationError> {
        self.whole_number(field, value, self.config.price_range)
    }

    /// Validate a quantity in quintals
    pub fn validate_quantity(&self, field: &'static str, value: f64) -> Result<u32, ValidationError> {
        self.whole_number(field, value, self.config.quantity_range)
    }

    /// Validate a field size in acres
    pub fn validate_acres(&self, value: f64) -> Result<(), ValidationError> {
        self.validate_range("fieldSize_acres", value, self.config.acres_range)
    }

    /// Validate a harvest week
    pub fn validate_harvest_week(&self, value: i64) -> Result<u8, ValidationError> {
        self.whole_number("harvestWeek", value as f64, self.config.harvest_week_range)
            .map(|w| w as u8)
    }

    /// Validate a price history window
    pub fn validate_days(&self, value: i64) -> Result<u32, ValidationError> {
        self.whole_number("days", value as f64, self.config.days_range)
    }

    /// Validate an ISO `YYYY-MM-DD` date
    pub fn validate_date(&self, field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
        NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
            .map_err(|_| ValidationError::InvalidFormat(format!("{} must be a YYYY-MM-DD date", field)))
    }
}
