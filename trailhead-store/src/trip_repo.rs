use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use trailhead_catalog::{NewTrip, Trip, TripStatus, TripUpdate};
use trailhead_core::{StoreError, StoreResult, TripRepository};
use uuid::Uuid;

use crate::database::backend_error;

pub struct PostgresTripRepository {
    pool: PgPool,
}

impl PostgresTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const TRIP_COLUMNS: &str =
    "id, title, total_slots, booked_slots, booking_fee, status, created_at, updated_at";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
pub(crate) struct TripRow {
    id: Uuid,
    title: String,
    total_slots: i32,
    booked_slots: i32,
    booking_fee: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = StoreError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<TripStatus>().map_err(|e| StoreError::Corrupt {
            id: row.id,
            reason: e.to_string(),
        })?;

        Ok(Trip {
            id: row.id,
            title: row.title,
            total_slots: row.total_slots,
            booked_slots: row.booked_slots,
            booking_fee: row.booking_fee,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl TripRepository for PostgresTripRepository {
    async fn create_trip(&self, new_trip: NewTrip) -> StoreResult<Trip> {
        let trip = Trip::new(new_trip);

        sqlx::query(
            r#"
            INSERT INTO trips (id, title, total_slots, booked_slots, booking_fee, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(trip.id)
        .bind(&trip.title)
        .bind(trip.total_slots)
        .bind(trip.booked_slots)
        .bind(trip.booking_fee)
        .bind(trip.status.as_str())
        .bind(trip.created_at)
        .bind(trip.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(trip)
    }

    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips WHERE id = $1",
            TRIP_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        row.map(Trip::try_from).transpose()
    }

    async fn list_trips(&self) -> StoreResult<Vec<Trip>> {
        let rows = sqlx::query_as::<_, TripRow>(&format!(
            "SELECT {} FROM trips ORDER BY created_at DESC",
            TRIP_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;

        rows.into_iter().map(Trip::try_from).collect()
    }

    async fn update_trip(&self, id: Uuid, update: &TripUpdate) -> StoreResult<Option<Trip>> {
        // The capacity guard lives in the WHERE clause so a concurrent
        // confirmation cannot slip between check and write.
        let row = sqlx::query_as::<_, TripRow>(&format!(
            r#"
            UPDATE trips SET
                title = COALESCE($2, title),
                total_slots = COALESCE($3, total_slots),
                booking_fee = COALESCE($4, booking_fee),
                status = COALESCE($5, status),
                updated_at = NOW()
            WHERE id = $1 AND COALESCE($3, total_slots) >= booked_slots
            RETURNING {}
            "#,
            TRIP_COLUMNS
        ))
        .bind(id)
        .bind(update.title.as_deref().map(str::trim))
        .bind(update.total_slots)
        .bind(update.booking_fee)
        .bind(update.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        if let Some(row) = row {
            return Trip::try_from(row).map(Some);
        }

        // Nothing updated: either the trip is gone or the guard refused
        match self.get_trip(id).await? {
            None => Ok(None),
            Some(current) => Err(StoreError::CapacityBelowBooked {
                requested: update.total_slots.unwrap_or(current.total_slots),
                booked: current.booked_slots,
            }),
        }
    }
}
