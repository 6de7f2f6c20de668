//! HTTP Routes

pub mod advisor;
pub mod dashboard;
pub mod farmers;
pub mod market;
pub mod marketplace;
pub mod onboarding;

use axum::body::Bytes;
use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;
use crate::AppState;

/// Parse a JSON body, treating an empty body as `{}`
pub(crate) fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) { b"{}" } else { &body[..] };
    serde_json::from_slice(raw).map_err(|e| {
        debug!("Rejected request body: {}", e);
        ApiError::bad_request("Invalid JSON body")
    })
}

/// Current MSP for a crop: stored value, else the configured table
pub(crate) async fn msp_for(state: &AppState, crop: &str) -> Result<u32, ApiError> {
    Ok(match state.store.get_msp(crop).await? {
        Some(value) => value.price_per_qtl,
        None => state.msp.lookup(crop),
    })
}

/// Evaluation date for templated advice
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Default)]
    struct UidBody {
        uid: Option<String>,
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let body: UidBody = parse_body(&Bytes::from_static(b"  ")).unwrap();
        assert!(body.uid.is_none());
    }

    #[test]
    fn test_malformed_body() {
        let err = parse_body::<UidBody>(&Bytes::from_static(b"{uid:")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid JSON body"));
    }
}
