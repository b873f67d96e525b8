use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info, warn};
use trailhead_core::{
    ConfirmOutcome, PaymentStatus, Registration, RegistrationRepository, StoreError, StoreResult,
};
use trailhead_shared::Masked;
use uuid::Uuid;

use crate::database::backend_error;

pub struct PostgresRegistrationRepository {
    pool: PgPool,
}

impl PostgresRegistrationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const REGISTRATION_COLUMNS: &str = "id, trip_id, name, phone, queries, payment_status, amount_paid, \
     order_ref, payment_ref, failure_reason, created_at, updated_at";

/// Reason stored when a verified payment finds the trip already full
pub const NO_SLOT_REASON: &str = "fully booked";

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct RegistrationRow {
    id: Uuid,
    trip_id: Uuid,
    name: String,
    phone: String,
    queries: String,
    payment_status: String,
    amount_paid: i64,
    order_ref: String,
    payment_ref: Option<String>,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RegistrationRow> for Registration {
    type Error = StoreError;

    fn try_from(row: RegistrationRow) -> Result<Self, Self::Error> {
        let payment_status = row
            .payment_status
            .parse::<PaymentStatus>()
            .map_err(|reason| StoreError::Corrupt { id: row.id, reason })?;

        Ok(Registration {
            id: row.id,
            trip_id: row.trip_id,
            name: row.name,
            phone: Masked::new(row.phone),
            queries: row.queries,
            payment_status,
            amount_paid: row.amount_paid,
            order_ref: row.order_ref,
            payment_ref: row.payment_ref,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl RegistrationRepository for PostgresRegistrationRepository {
    async fn create_registration(&self, registration: &Registration) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO registrations (id, trip_id, name, phone, queries, payment_status, amount_paid, order_ref, payment_ref, failure_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(registration.id)
        .bind(registration.trip_id)
        .bind(&registration.name)
        .bind(registration.phone.expose())
        .bind(&registration.queries)
        .bind(registration.payment_status.as_str())
        .bind(registration.amount_paid)
        .bind(&registration.order_ref)
        .bind(registration.payment_ref.as_deref())
        .bind(registration.failure_reason.as_deref())
        .bind(registration.created_at)
        .bind(registration.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(())
    }

    async fn get_registration(&self, id: Uuid) -> StoreResult<Option<Registration>> {
        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE id = $1",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend_error)?;

        row.map(Registration::try_from).transpose()
    }

    async fn list_registrations(&self, trip_id: Option<Uuid>) -> StoreResult<Vec<Registration>> {
        let rows = sqlx::query_as::<_, RegistrationRow>(&format!(
            "SELECT {} FROM registrations WHERE ($1::uuid IS NULL OR trip_id = $1) ORDER BY created_at DESC",
            REGISTRATION_COLUMNS
        ))
        .bind(trip_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend_error)?;

        rows.into_iter().map(Registration::try_from).collect()
    }

    async fn fail_registration(
        &self,
        id: Uuid,
        payment_ref: Option<&str>,
        reason: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE registrations
            SET payment_status = 'FAILED',
                payment_ref = COALESCE($2, payment_ref),
                failure_reason = $3,
                updated_at = NOW()
            WHERE id = $1 AND payment_status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(payment_ref)
        .bind(reason)
        .execute(&self.pool)
        .await
        .map_err(backend_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn confirm_registration(&self, id: Uuid, payment_ref: &str) -> StoreResult<ConfirmOutcome> {
        let mut tx = self.pool.begin().await.map_err(backend_error)?;

        // Lock the registration row so two confirmations serialize here
        let current: Option<(Uuid, String)> = sqlx::query_as(
            "SELECT trip_id, payment_status FROM registrations WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_error)?;

        let Some((trip_id, status)) = current else {
            return Ok(ConfirmOutcome::NotFound);
        };

        let status = status
            .parse::<PaymentStatus>()
            .map_err(|reason| StoreError::Corrupt { id, reason })?;
        if status != PaymentStatus::Pending {
            return Ok(ConfirmOutcome::NotPending(status));
        }

        let claimed: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE trips
            SET booked_slots = booked_slots + 1, updated_at = NOW()
            WHERE id = $1 AND booked_slots < total_slots
            RETURNING booked_slots
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_error)?;

        let outcome = match claimed {
            Some((booked_slots,)) => {
                sqlx::query(
                    r#"
                    UPDATE registrations
                    SET payment_status = 'COMPLETED', payment_ref = $2, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(payment_ref)
                .execute(&mut *tx)
                .await
                .map_err(backend_error)?;

                ConfirmOutcome::Confirmed { booked_slots }
            }
            None => {
                sqlx::query(
                    r#"
                    UPDATE registrations
                    SET payment_status = 'FAILED', payment_ref = $2, failure_reason = $3, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(payment_ref)
                .bind(NO_SLOT_REASON)
                .execute(&mut *tx)
                .await
                .map_err(backend_error)?;

                warn!("Trip {} had no free slot for registration {}", trip_id, id);
                ConfirmOutcome::NoSlot
            }
        };

        tx.commit().await.map_err(backend_error)?;
        Ok(outcome)
    }

    async fn delete_registration(&self, id: Uuid) -> StoreResult<Option<Registration>> {
        let mut tx = self.pool.begin().await.map_err(backend_error)?;

        let row = sqlx::query_as::<_, RegistrationRow>(&format!(
            "DELETE FROM registrations WHERE id = $1 RETURNING {}",
            REGISTRATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let registration = Registration::try_from(row)?;

        if registration.holds_slot() {
            sqlx::query(
                r#"
                UPDATE trips
                SET booked_slots = GREATEST(booked_slots - 1, 0), updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(registration.trip_id)
            .execute(&mut *tx)
            .await
            .map_err(backend_error)?;

            info!("Released slot on trip {} from registration {}", registration.trip_id, id);
        }

        tx.commit().await.map_err(backend_error)?;
        Ok(Some(registration))
    }
}
