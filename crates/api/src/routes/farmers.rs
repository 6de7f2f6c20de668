//! Farmer Lifecycle Routes

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use classifier::Band;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{FarmerRecord, LifecycleStatus, MatchRecord};
use tracing::info;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;

use super::parse_body;

async fn load_farmer(state: &AppState, uid: &str) -> Result<FarmerRecord, ApiError> {
    state
        .store
        .get_farmer(uid)
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer not found"))
}

/// Result of advancing the lifecycle
#[derive(Debug, Serialize)]
pub struct AdvanceResponse {
    pub success: bool,
    pub previous: LifecycleStatus,
    pub status: LifecycleStatus,
}

/// Move a farmer's crop one lifecycle step forward
pub async fn advance_status(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(uid): Path<String>,
) -> Result<Json<AdvanceResponse>, ApiError> {
    let farmer = load_farmer(&state, &uid).await?;
    let previous = farmer.status;
    let next = previous
        .next()
        .ok_or_else(|| ApiError::bad_request("Crop is already sold"))?;

    let updated = state.store.set_farmer_status(&uid, previous, next).await?;
    info!(request_id = %ctx.request_id, "Farmer {} advanced to {}", uid, next.as_str());

    Ok(Json(AdvanceResponse {
        success: true,
        previous,
        status: updated.status,
    }))
}

/// Body of a sale-price update
#[derive(Debug, Default, Deserialize)]
pub struct ActualPriceRequest {
    #[serde(rename = "actualPrice")]
    pub actual_price: Option<f64>,
}

/// Sale price against the estimate
#[derive(Debug, Serialize)]
pub struct ActualPriceResponse {
    pub success: bool,
    #[serde(rename = "actualPrice")]
    pub actual_price: u32,
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: Option<u32>,
    /// Actual minus estimated (₹/quintal)
    pub difference: Option<i64>,
}

/// Record the price a farmer actually sold at
pub async fn actual_price(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(uid): Path<String>,
    body: Bytes,
) -> Result<Json<ActualPriceResponse>, ApiError> {
    let request: ActualPriceRequest = parse_body(&body)?;
    let raw = request
        .actual_price
        .ok_or_else(|| ApiError::bad_request("actualPrice required"))?;
    let price = state.validator.validate_price("actualPrice", raw)?;

    let farmer = state.store.set_actual_price(&uid, price).await.map_err(|e| match e {
        storage::StorageError::NotFound => ApiError::not_found("Farmer not found"),
        other => other.into(),
    })?;
    info!(request_id = %ctx.request_id, "Farmer {} sold at {}", uid, price);

    Ok(Json(ActualPriceResponse {
        success: true,
        actual_price: price,
        estimated_price: farmer.estimated_price,
        difference: farmer
            .estimated_price
            .map(|estimate| i64::from(price) - i64::from(estimate)),
    }))
}

/// Body of a harvest-window acceptance
#[derive(Debug, Default, Deserialize)]
pub struct HarvestWindowRequest {
    #[serde(rename = "harvestWeek")]
    pub harvest_week: Option<i64>,
}

/// New calendar slot after accepting a window
#[derive(Debug, Serialize)]
pub struct HarvestWindowResponse {
    pub success: bool,
    #[serde(rename = "harvestWeek")]
    pub harvest_week: u8,
    pub farmer_count: u32,
    pub level: Band,
}

/// Accept a recommended harvest window, moving the farmer to that week
pub async fn harvest_window(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(uid): Path<String>,
    body: Bytes,
) -> Result<Json<HarvestWindowResponse>, ApiError> {
    let request: HarvestWindowRequest = parse_body(&body)?;
    let week = state
        .validator
        .validate_harvest_week(request.harvest_week.unwrap_or(1))?;

    load_farmer(&state, &uid).await?;
    let farmer = state.store.move_harvest_week(&uid, week).await?;
    let farmer_count = state
        .store
        .calendar_entry(&farmer.calendar_key())
        .await?
        .map(|entry| entry.farmer_count)
        .unwrap_or(1);
    let level = state.classifier.classify_supply(farmer_count);

    info!(
        request_id = %ctx.request_id,
        "Farmer {} moved to week {} ({} farmers, {})",
        uid, week, farmer_count, level
    );

    Ok(Json(HarvestWindowResponse {
        success: true,
        harvest_week: week,
        farmer_count,
        level,
    }))
}

/// Buyer matches a farmer has accepted
#[derive(Debug, Serialize)]
pub struct FarmerMatchesResponse {
    pub uid: String,
    pub count: usize,
    pub matches: Vec<MatchRecord>,
}

/// List a farmer's accepted matches, newest first
pub async fn matches(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<FarmerMatchesResponse>, ApiError> {
    load_farmer(&state, &uid).await?;
    let matches = state.store.matches_by_farmer(&uid).await?;

    Ok(Json(FarmerMatchesResponse {
        uid,
        count: matches.len(),
        matches,
    }))
}
