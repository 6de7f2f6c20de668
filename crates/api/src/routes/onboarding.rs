//! Onboarding Routes

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use request_validator::{ValidationResult, Validator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use storage::{
    BuyerRecord, FarmerRecord, Language, LifecycleStatus, Role, SoilType, UserRecord,
};
use tracing::info;

use crate::context::RequestContext;
use crate::error::ApiError;
use crate::AppState;

use super::parse_body;

/// Body of an onboarding request
#[derive(Debug, Default, Deserialize)]
pub struct OnboardingRequest {
    /// Falls back to the caller uid
    pub uid: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub district: Option<String>,
    pub mandal: Option<String>,
    /// Falls back to the request language
    pub language: Option<Language>,
    /// Crops grown; the first is the primary crop
    #[serde(default)]
    pub crops: Vec<String>,
    pub variety: Option<String>,
    #[serde(rename = "sownDate")]
    pub sown_date: Option<String>,
    #[serde(rename = "fieldSize_acres")]
    pub field_size_acres: Option<f64>,
    #[serde(rename = "soilType")]
    pub soil_type: Option<SoilType>,
}

/// Created profile summary
#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub success: bool,
    pub uid: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viability_days: Option<i32>,
    #[serde(rename = "harvestWeek", skip_serializing_if = "Option::is_none")]
    pub harvest_week: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub farmer_count: Option<u32>,
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// Create a user and its farmer or buyer profile
pub async fn onboard(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    body: Bytes,
) -> Result<Json<OnboardingResponse>, ApiError> {
    let request: OnboardingRequest = parse_body(&body)?;
    let uid = request
        .uid
        .clone()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| ctx.caller_uid.clone());

    state.validator.require(&[
        ("uid", uid.is_some()),
        ("name", Validator::present(request.name.as_deref())),
        ("role", request.role.is_some()),
        ("district", Validator::present(request.district.as_deref())),
        ("mandal", Validator::present(request.mandal.as_deref())),
    ])?;
    let (Some(uid), Some(role)) = (uid, request.role) else {
        return Err(ApiError::bad_request("Missing required fields"));
    };

    let now = Utc::now();
    let user = UserRecord {
        uid: uid.clone(),
        name: text(&request.name),
        phone: text(&request.phone),
        role,
        district: text(&request.district),
        mandal: text(&request.mandal),
        language: request.language.unwrap_or(ctx.language),
        created_at: now,
    };

    match role {
        Role::Farmer => {
            let crop = request
                .crops
                .first()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            state.validator.require(&[
                ("crops", crop.is_some()),
                ("sownDate", Validator::present(request.sown_date.as_deref())),
                ("fieldSize_acres", request.field_size_acres.is_some()),
                ("soilType", request.soil_type.is_some()),
            ])?;
            let (Some(crop), Some(acres), Some(soil_type)) =
                (crop, request.field_size_acres, request.soil_type)
            else {
                return Err(ApiError::bad_request("Missing required fields"));
            };

            let sown_date = text(&request.sown_date);
            ValidationResult::from_checks(vec![
                state.validator.validate_date("sownDate", &sown_date).map(|_| ()),
                state.validator.validate_acres(acres),
            ])
            .into_result()?;

            let viability_days = state.crops.viability_for(&crop);
            let farmer = FarmerRecord {
                uid: uid.clone(),
                crop,
                variety: text(&request.variety),
                sown_date,
                field_size_acres: acres,
                soil_type,
                district: user.district.clone(),
                mandal: user.mandal.clone(),
                expected_qtl: None,
                quantity_confirmed: false,
                viability_days,
                harvest_week: 1,
                status: LifecycleStatus::Growing,
                estimated_price: None,
                actual_price: None,
            };
            let key = farmer.calendar_key();
            let previous = state.store.get_farmer(&uid).await?;

            state.store.put_user(user).await?;
            state.store.put_farmer(farmer).await?;
            if let Some(old_key) = previous.map(|p| p.calendar_key()).filter(|k| *k != key) {
                let remaining = state.store.unregister_harvest(&old_key, &uid).await?;
                info!(
                    request_id = %ctx.request_id,
                    "Farmer {} left {} ({} remain)",
                    uid,
                    old_key.doc_id(),
                    remaining
                );
            }
            let farmer_count = state.store.register_harvest(&key, &uid).await?;
            info!(request_id = %ctx.request_id, "Onboarded farmer {} into {}", uid, key.doc_id());

            Ok(Json(OnboardingResponse {
                success: true,
                uid,
                role,
                viability_days: Some(viability_days),
                harvest_week: Some(1),
                farmer_count: Some(farmer_count),
            }))
        }
        Role::Buyer => {
            let buyer = BuyerRecord {
                uid: uid.clone(),
                business_name: user.name.clone(),
                district: user.district.clone(),
                phone: user.phone.clone(),
            };

            state.store.put_user(user).await?;
            state.store.put_buyer(buyer).await?;
            info!(request_id = %ctx.request_id, "Onboarded buyer {}", uid);

            Ok(Json(OnboardingResponse {
                success: true,
                uid,
                role,
                viability_days: None,
                harvest_week: None,
                farmer_count: None,
            }))
        }
    }
}
