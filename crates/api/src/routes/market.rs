//! Market Price Routes

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use storage::PriceSeries;

use crate::error::ApiError;
use crate::AppState;

use super::today;

/// Query parameters for the price series
#[derive(Debug, Deserialize)]
pub struct PriceQuery {
    pub crop: Option<String>,
    pub days: Option<String>,
}

/// Get the mandi price series for a crop
pub async fn prices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PriceQuery>,
) -> Result<Json<PriceSeries>, ApiError> {
    let crop = params
        .crop
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| "paddy".to_string());

    let days = match params.days.as_deref().map(str::trim) {
        None | Some("") => 30,
        Some(raw) => {
            let parsed: i64 = raw
                .parse()
                .map_err(|_| ApiError::bad_request("days must be a whole number"))?;
            state.validator.validate_days(parsed)?
        }
    };

    Ok(Json(state.prices.series(&crop, days, today())))
}
