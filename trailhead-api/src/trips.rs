use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use trailhead_catalog::Trip;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::AppPath;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TripResponse {
    #[serde(flatten)]
    pub trip: Trip,
    pub remaining_slots: i32,
}

impl From<Trip> for TripResponse {
    fn from(trip: Trip) -> Self {
        let remaining_slots = trip.remaining_slots();
        Self { trip, remaining_slots }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/trips", get(list_trips))
        .route("/v1/trips/{id}", get(get_trip))
}

/// GET /v1/trips
async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<TripResponse>>, AppError> {
    let trips = state.trips.list_trips().await?;
    Ok(Json(trips.into_iter().map(TripResponse::from).collect()))
}

/// GET /v1/trips/{id}
async fn get_trip(
    State(state): State<AppState>,
    AppPath(trip_id): AppPath<Uuid>,
) -> Result<Json<TripResponse>, AppError> {
    let trip = state
        .trips
        .get_trip(trip_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("trip not found".to_string()))?;

    Ok(Json(trip.into()))
}
