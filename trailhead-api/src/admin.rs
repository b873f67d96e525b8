use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use trailhead_catalog::{NewTrip, TripUpdate};
use trailhead_core::Registration;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{AppJson, AppPath, AppQuery};
use crate::middleware::{admin_auth_middleware, AdminClaims};
use crate::state::AppState;
use crate::trips::TripResponse;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRegistrationsQuery {
    pub trip_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/v1/admin/trips", post(create_trip))
        .route("/v1/admin/trips/{id}", put(update_trip))
        .route("/v1/admin/registrations", get(list_registrations))
        .route(
            "/v1/admin/registrations/{id}",
            get(get_registration).delete(delete_registration),
        )
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}

// ============================================================================
// Trip Management Handlers
// ============================================================================

/// POST /v1/admin/trips
async fn create_trip(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<AdminClaims>,
    AppJson(req): AppJson<NewTrip>,
) -> Result<(StatusCode, Json<TripResponse>), AppError> {
    req.validate()?;

    let trip = state.trips.create_trip(req).await?;
    tracing::info!("Trip {} created by {}", trip.id, claims.sub);

    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// PUT /v1/admin/trips/{id}
async fn update_trip(
    State(state): State<AppState>,
    AppPath(trip_id): AppPath<Uuid>,
    AppJson(req): AppJson<TripUpdate>,
) -> Result<Json<TripResponse>, AppError> {
    req.validate()?;

    let trip = state
        .trips
        .update_trip(trip_id, &req)
        .await?
        .ok_or_else(|| AppError::NotFoundError("trip not found".to_string()))?;

    Ok(Json(trip.into()))
}

// ============================================================================
// Registration Ledger Handlers
// ============================================================================

/// GET /v1/admin/registrations?tripId=
async fn list_registrations(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListRegistrationsQuery>,
) -> Result<Json<Vec<Registration>>, AppError> {
    let registrations = state.registrations.list_registrations(query.trip_id).await?;
    Ok(Json(registrations))
}

/// GET /v1/admin/registrations/{id}
async fn get_registration(
    State(state): State<AppState>,
    AppPath(registration_id): AppPath<Uuid>,
) -> Result<Json<Registration>, AppError> {
    let registration = state
        .registrations
        .get_registration(registration_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("registration not found".to_string()))?;

    Ok(Json(registration))
}

/// DELETE /v1/admin/registrations/{id}
async fn delete_registration(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<AdminClaims>,
    AppPath(registration_id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    state.orchestrator.delete(registration_id).await?;
    tracing::info!("Registration {} deleted by {}", registration_id, claims.sub);

    Ok(Json(MessageResponse {
        message: "Registration deleted".to_string(),
    }))
}
