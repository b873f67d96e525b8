use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use trailhead_booking::{InitiateBooking, VerifyPayment};
use trailhead_core::GatewayOrder;
use trailhead_shared::Masked;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::AppJson;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateRequest {
    pub trip_id: Uuid,
    pub name: String,
    pub phone: Masked<String>,
    #[serde(default)]
    pub queries: String,
}

#[derive(Debug, Serialize)]
pub struct InitiateResponse {
    pub success: bool,
    pub order: GatewayOrder,
    #[serde(rename = "registrationId")]
    pub registration_id: Uuid,
    pub key_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub registration_id: Uuid,
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub registration_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings/initiate", post(initiate_booking))
        .route("/v1/bookings/verify", post(verify_payment))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/bookings/initiate
/// Start checkout for a trip and hand back the gateway order
async fn initiate_booking(
    State(state): State<AppState>,
    AppJson(req): AppJson<InitiateRequest>,
) -> Result<(StatusCode, Json<InitiateResponse>), AppError> {
    let initiated = state
        .orchestrator
        .initiate(InitiateBooking {
            trip_id: req.trip_id,
            name: req.name,
            phone: req.phone,
            queries: req.queries,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(InitiateResponse {
            success: true,
            order: initiated.order,
            registration_id: initiated.registration_id,
            key_id: state.gateway_key_id.clone(),
        }),
    ))
}

/// POST /v1/bookings/verify
/// Gateway callback relayed by the checkout client
async fn verify_payment(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyRequest>,
) -> Result<Json<VerifyResponse>, AppError> {
    let verified = state
        .orchestrator
        .verify(VerifyPayment {
            registration_id: req.registration_id,
            order_ref: req.order_ref,
            payment_ref: req.payment_ref,
            signature: req.signature,
        })
        .await?;

    Ok(Json(VerifyResponse {
        success: true,
        registration_id: verified.registration_id,
    }))
}
