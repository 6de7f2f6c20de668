//! Marketplace Routes

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use classifier::{check_acceptance, RejectReason};
use request_validator::Validator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{BuyerRecord, ListingRecord, ListingStatus, MatchRecord, StorageError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::telemetry::{record_acceptance, record_listing};
use crate::AppState;

use super::{msp_for, parse_body};

/// Body of an accept request
#[derive(Debug, Default, Deserialize)]
pub struct AcceptRequest {
    #[serde(rename = "farmerUid")]
    pub farmer_uid: Option<String>,
    #[serde(rename = "listingId")]
    pub listing_id: Option<String>,
}

/// Outcome of an accept request
#[derive(Debug, Serialize)]
pub struct AcceptResponse {
    pub success: bool,
    #[serde(rename = "matchId", skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AcceptResponse {
    fn matched(match_id: String) -> Self {
        record_acceptance("matched");
        Self {
            success: true,
            match_id: Some(match_id),
            reason: None,
            message: None,
        }
    }

    fn rejected(reason: RejectReason, crop: &str, msp: u32) -> Self {
        record_acceptance(reason.as_str());
        Self {
            success: false,
            match_id: None,
            reason: Some(reason),
            message: Some(reason.message(crop, msp)),
        }
    }
}

/// Farmer accepts a buyer listing
pub async fn accept(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<AcceptResponse>, ApiError> {
    let request: AcceptRequest = parse_body(&body)?;
    let (Some(farmer_uid), Some(listing_id)) = (
        request.farmer_uid.filter(|v| Validator::present(Some(v.as_str()))),
        request.listing_id.filter(|v| Validator::present(Some(v.as_str()))),
    ) else {
        return Err(ApiError::bad_request("Missing fields"));
    };

    let listing = state
        .store
        .get_listing(&listing_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Listing not found"))?;

    let msp = msp_for(&state, &listing.crop).await?;
    if let Err(reason) = check_acceptance(
        listing.price_per_qtl,
        msp,
        listing.status == ListingStatus::Open,
    ) {
        info!(request_id = %ctx.request_id, "Listing {} rejected: {}", listing_id, reason.as_str());
        return Ok(Json(AcceptResponse::rejected(reason, &listing.crop, msp)));
    }

    let record = MatchRecord::for_listing(&farmer_uid, &listing, Utc::now());
    match state.store.accept_listing(&listing_id, record).await {
        Ok(record) => {
            info!(request_id = %ctx.request_id, "Farmer {} matched listing {}", farmer_uid, listing_id);
            Ok(Json(AcceptResponse::matched(record.match_id)))
        }
        Err(StorageError::Conflict(detail)) => {
            warn!(request_id = %ctx.request_id, "Lost acceptance race: {}", detail);
            Ok(Json(AcceptResponse::rejected(RejectReason::NotAvailable, &listing.crop, msp)))
        }
        Err(StorageError::NotFound) => Err(ApiError::not_found("Listing not found")),
        Err(e) => Err(e.into()),
    }
}

/// Body of a post-demand request
#[derive(Debug, Default, Deserialize)]
pub struct PostDemandRequest {
    #[serde(rename = "buyerUid")]
    pub buyer_uid: Option<String>,
    pub crop: Option<String>,
    pub variety: Option<String>,
    #[serde(rename = "quantityQtl")]
    pub quantity_qtl: Option<f64>,
    #[serde(rename = "targetDate")]
    pub target_date: Option<String>,
    #[serde(rename = "pricePerQtl")]
    pub price_per_qtl: Option<f64>,
    pub district: Option<String>,
}

/// Result of posting demand
#[derive(Debug, Serialize)]
pub struct PostDemandResponse {
    pub success: bool,
    #[serde(rename = "listingId")]
    pub listing_id: String,
    #[serde(rename = "isBelowMSP")]
    pub is_below_msp: bool,
}

/// Buyer posts a demand listing
pub async fn post_demand(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<PostDemandResponse>, ApiError> {
    let request: PostDemandRequest = parse_body(&body)?;
    let nonzero = |v: Option<f64>| v.is_some_and(|n| n != 0.0);

    state
        .validator
        .require(&[
            ("buyerUid", Validator::present(request.buyer_uid.as_deref())),
            ("crop", Validator::present(request.crop.as_deref())),
            ("quantityQtl", nonzero(request.quantity_qtl)),
            ("pricePerQtl", nonzero(request.price_per_qtl)),
        ])
        .map_err(|_| ApiError::bad_request("Missing required fields"))?;

    let buyer_uid = request.buyer_uid.unwrap_or_default().trim().to_string();
    let crop = request.crop.unwrap_or_default().trim().to_string();
    let quantity_qtl = state
        .validator
        .validate_quantity("quantityQtl", request.quantity_qtl.unwrap_or_default())?;
    let price_per_qtl = state
        .validator
        .validate_price("pricePerQtl", request.price_per_qtl.unwrap_or_default())?;

    let target_date = request.target_date.unwrap_or_default();
    if !target_date.trim().is_empty() {
        state.validator.validate_date("targetDate", &target_date)?;
    }

    let msp = msp_for(&state, &crop).await?;
    let is_below_msp = price_per_qtl < msp;
    let posted_at = Utc::now();
    let listing = ListingRecord {
        listing_id: format!(
            "listing_{}_{}_{}",
            buyer_uid,
            posted_at.timestamp_millis(),
            Uuid::new_v4().simple()
        ),
        buyer_uid,
        crop,
        variety: request.variety.unwrap_or_default(),
        quantity_qtl,
        target_date,
        price_per_qtl,
        district: request.district.unwrap_or_default(),
        is_below_msp,
        status: ListingStatus::Open,
        posted_at,
    };
    let listing_id = listing.listing_id.clone();

    state.store.insert_listing(listing).await?;
    record_listing(is_below_msp);
    info!(
        request_id = %ctx.request_id,
        "Posted {} (below MSP: {})",
        listing_id, is_below_msp
    );

    Ok(Json(PostDemandResponse {
        success: true,
        listing_id,
        is_below_msp,
    }))
}

/// Query parameters for browsing listings
#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    #[serde(default = "default_crop")]
    pub crop: String,
}

fn default_crop() -> String {
    "paddy".to_string()
}

/// Open listings for a crop
#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub crop: String,
    pub msp: u32,
    pub data: Vec<ListingRecord>,
    pub count: usize,
}

/// Browse open listings for a crop
pub async fn open_listings(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingQuery>,
) -> Result<Json<ListingResponse>, ApiError> {
    let data = state.store.open_listings(&params.crop).await?;
    let msp = msp_for(&state, &params.crop).await?;

    Ok(Json(ListingResponse {
        count: data.len(),
        crop: params.crop,
        msp,
        data,
    }))
}

/// A buyer's listings and matches
#[derive(Debug, Serialize)]
pub struct BuyerOverview {
    pub buyer: BuyerRecord,
    pub listings: Vec<ListingRecord>,
    pub matches: Vec<MatchRecord>,
    pub open_count: usize,
    pub matched_count: usize,
}

/// Get a buyer's overview
pub async fn buyer_overview(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<BuyerOverview>, ApiError> {
    let buyer = state
        .store
        .get_buyer(&uid)
        .await?
        .ok_or_else(|| ApiError::not_found("Buyer not found"))?;
    let listings = state.store.listings_by_buyer(&uid).await?;
    let matches = state.store.matches_by_buyer(&uid).await?;

    let open_count = listings
        .iter()
        .filter(|l| l.status == ListingStatus::Open)
        .count();
    let matched_count = listings
        .iter()
        .filter(|l| l.status == ListingStatus::Matched)
        .count();

    Ok(Json(BuyerOverview {
        buyer,
        listings,
        matches,
        open_count,
        matched_count,
    }))
}
