//! Dashboard Routes

use axum::extract::{Query, State};
use axum::Json;
use classifier::Band;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{FarmerRecord, LifecycleStatus};
use tracing::debug;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;

use super::msp_for;

/// Mandi price quoted when the farmer has no estimate (₹/quintal)
const DEFAULT_MANDI_PRICE: u32 = 2100;

/// Query parameters for the summary endpoint
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub uid: Option<String>,
}

/// Farmer fields shown on the dashboard
#[derive(Debug, Serialize)]
pub struct FarmerView {
    pub uid: String,
    pub name: String,
    pub crop: String,
    pub variety: String,
    #[serde(rename = "sownDate")]
    pub sown_date: String,
    #[serde(rename = "fieldSize_acres")]
    pub field_size_acres: f64,
    #[serde(rename = "expectedQtl")]
    pub expected_qtl: Option<u32>,
    pub viability_days: i32,
    #[serde(rename = "harvestWeek")]
    pub harvest_week: u8,
    pub status: LifecycleStatus,
    #[serde(rename = "estimatedPrice")]
    pub estimated_price: Option<u32>,
    #[serde(rename = "actualPrice")]
    pub actual_price: Option<u32>,
}

impl FarmerView {
    fn new(farmer: FarmerRecord, name: String) -> Self {
        Self {
            uid: farmer.uid,
            name,
            crop: farmer.crop,
            variety: farmer.variety,
            sown_date: farmer.sown_date,
            field_size_acres: farmer.field_size_acres,
            expected_qtl: farmer.expected_qtl,
            viability_days: farmer.viability_days,
            harvest_week: farmer.harvest_week,
            status: farmer.status,
            estimated_price: farmer.estimated_price,
            actual_price: farmer.actual_price,
        }
    }
}

/// Supply pressure in the farmer's calendar slot
#[derive(Debug, Serialize)]
pub struct SupplyPressure {
    pub farmer_count: u32,
    pub level: Band,
    pub label: String,
}

/// Joined dashboard view
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub farmer: FarmerView,
    pub supply_pressure: SupplyPressure,
    pub msp: u32,
    pub current_mandi_price: u32,
    pub viability_status: Band,
    pub emergency: bool,
}

/// Get the dashboard summary for a farmer
pub async fn summary(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let uid = params
        .uid
        .filter(|u| !u.trim().is_empty())
        .or(ctx.caller_uid)
        .ok_or_else(|| ApiError::bad_request("uid required"))?;

    let farmer = state
        .store
        .get_farmer(&uid)
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer not found"))?;
    let name = state
        .store
        .get_user(&uid)
        .await?
        .map(|u| u.name)
        .unwrap_or_default();

    let msp = msp_for(&state, &farmer.crop).await?;
    // a slot nobody registered in still holds this farmer
    let farmer_count = state
        .store
        .calendar_entry(&farmer.calendar_key())
        .await?
        .map(|entry| entry.farmer_count)
        .unwrap_or(1);

    let level = state.classifier.classify_supply(farmer_count);
    let viability_status = state.classifier.classify_viability(farmer.viability_days);
    let emergency = state.classifier.is_emergency(farmer.viability_days);
    let current_mandi_price = farmer
        .estimated_price
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_MANDI_PRICE);

    debug!(
        request_id = %ctx.request_id,
        "Dashboard for {}: supply {} ({}), viability {}",
        uid, level, farmer_count, viability_status
    );

    Ok(Json(DashboardSummary {
        farmer: FarmerView::new(farmer, name),
        supply_pressure: SupplyPressure {
            farmer_count,
            level,
            label: format!("Based on {} farmers in your mandal", farmer_count),
        },
        msp,
        current_mandi_price,
        viability_status,
        emergency,
    }))
}
