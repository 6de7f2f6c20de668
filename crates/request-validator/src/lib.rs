//! Request Validation
//!
//! Required-field and range checks applied to inbound marketplace requests
//! before they reach storage.

mod error;
mod validator;

pub use error::ValidationError;
pub use validator::{ValidationConfig, ValidationResult, Validator};
