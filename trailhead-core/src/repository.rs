use async_trait::async_trait;
use trailhead_catalog::{NewTrip, Trip, TripUpdate};
use uuid::Uuid;

use crate::payment::PaymentStatus;
use crate::registration::Registration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Datastore error: {0}")]
    Backend(String),

    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    #[error("totalSlots {requested} is below the {booked} slots already booked")]
    CapacityBelowBooked { requested: i32, booked: i32 },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of the atomic "complete registration and claim a slot" operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmOutcome {
    /// Registration is Completed and the trip's counter now reads `booked_slots`
    Confirmed { booked_slots: i32 },
    /// The trip had no free slot left; the registration was marked Failed
    NoSlot,
    /// The registration was no longer Pending; nothing changed
    NotPending(PaymentStatus),
    NotFound,
}

/// Repository trait for trip catalog access
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create_trip(&self, trip: NewTrip) -> StoreResult<Trip>;

    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>>;

    /// Newest first
    async fn list_trips(&self) -> StoreResult<Vec<Trip>>;

    /// Partial edit. Fails with `CapacityBelowBooked` instead of shrinking
    /// `total_slots` under `booked_slots`; the check and write are atomic.
    async fn update_trip(&self, id: Uuid, update: &TripUpdate) -> StoreResult<Option<Trip>>;
}

/// Repository trait for the registration ledger.
///
/// `confirm_registration` and `delete_registration` also move the trip's
/// `booked_slots` counter and must do so atomically with the registration
/// change.
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    async fn create_registration(&self, registration: &Registration) -> StoreResult<()>;

    async fn get_registration(&self, id: Uuid) -> StoreResult<Option<Registration>>;

    /// Newest first, optionally for one trip
    async fn list_registrations(&self, trip_id: Option<Uuid>) -> StoreResult<Vec<Registration>>;

    /// Pending → Failed. Returns false when the registration was missing or
    /// already finalized.
    async fn fail_registration(
        &self,
        id: Uuid,
        payment_ref: Option<&str>,
        reason: &str,
    ) -> StoreResult<bool>;

    /// Pending → Completed together with a conditional
    /// `booked_slots + 1 where booked_slots < total_slots`.
    async fn confirm_registration(&self, id: Uuid, payment_ref: &str) -> StoreResult<ConfirmOutcome>;

    /// Remove the row; a Completed registration gives its slot back
    /// (clamped at zero). Returns the removed registration.
    async fn delete_registration(&self, id: Uuid) -> StoreResult<Option<Registration>>;
}
