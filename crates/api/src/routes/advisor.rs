//! Advisory Routes
//!
//! These never fail: an unreadable body gets the same safe default as a
//! failed call to the generative service.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use fallback::{
    HarvestAdvice, HarvestRequest, SellAdvice, SellRequest, ViabilityHint, YieldEstimate, YieldRequest,
};
use std::sync::Arc;
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::telemetry::record_advice;
use crate::AppState;

use super::today;

/// Viability from a body that did not parse as a whole
fn salvage_viability(body: &[u8]) -> Option<i32> {
    serde_json::from_slice::<ViabilityHint>(body)
        .ok()
        .and_then(|hint| hint.viability_days)
}

/// Harvest-window recommendation
pub async fn harvest(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Json<HarvestAdvice> {
    let mut request: HarvestRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(request_id = %ctx.request_id, "Unreadable harvest request: {}", e);
            record_advice("harvest", "fallback", 0);
            let fallback = HarvestRequest {
                viability_days: salvage_viability(&body),
                ..Default::default()
            };
            return Json(state.advisor.fallback().harvest_safe_default(&fallback));
        }
    };
    request.language.get_or_insert_with(|| ctx.language.as_str().to_string());

    let advice = state.advisor.harvest(&request, today()).await;
    info!(
        request_id = %ctx.request_id,
        source = advice.source.as_str(),
        latency_ms = advice.latency_ms,
        "Harvest advice, emergency={}",
        advice.body.emergency_sell
    );
    record_advice("harvest", advice.source.as_str(), advice.latency_ms);
    Json(advice.body)
}

/// Yield estimate
pub async fn quantity(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Json<YieldEstimate> {
    let request: YieldRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(request_id = %ctx.request_id, "Unreadable yield request: {}", e);
            record_advice("quantity", "fallback", 0);
            return Json(state.advisor.fallback().yield_safe_default());
        }
    };

    let advice = state.advisor.estimate_yield(&request).await;
    info!(
        request_id = %ctx.request_id,
        source = advice.source.as_str(),
        latency_ms = advice.latency_ms,
        "Yield estimate {} qtl",
        advice.body.estimated_quintals
    );
    record_advice("quantity", advice.source.as_str(), advice.latency_ms);
    Json(advice.body)
}

/// Sell/wait recommendation
pub async fn sell(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Json<SellAdvice> {
    let mut request: SellRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(request_id = %ctx.request_id, "Unreadable sell request: {}", e);
            record_advice("sell", "fallback", 0);
            let fallback = SellRequest {
                viability_days: salvage_viability(&body),
                ..Default::default()
            };
            return Json(state.advisor.fallback().sell_safe_default(&fallback));
        }
    };
    request.language.get_or_insert_with(|| ctx.language.as_str().to_string());

    let advice = state.advisor.sell(&request).await;
    info!(
        request_id = %ctx.request_id,
        source = advice.source.as_str(),
        latency_ms = advice.latency_ms,
        "Sell advice: {}",
        advice.body.decision
    );
    record_advice("sell", advice.source.as_str(), advice.latency_ms);
    Json(advice.body)
}
