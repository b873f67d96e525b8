use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use trailhead_catalog::{NewTrip, Trip, TripError, TripUpdate};
use trailhead_core::{
    ConfirmOutcome, PaymentStatus, Registration, RegistrationRepository, StoreError, StoreResult,
    TripRepository,
};
use uuid::Uuid;

use crate::registration_repo::NO_SLOT_REASON;

#[derive(Default)]
struct MemoryState {
    trips: HashMap<Uuid, Trip>,
    registrations: HashMap<Uuid, Registration>,
}

/// A thread-safe in-memory store for trips and registrations.
///
/// Both maps sit behind one `RwLock`, so operations that touch a registration
/// and its trip's slot counter happen under a single write guard, the same
/// atomicity the Postgres repositories get from a transaction.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully-formed trip, keeping its id and counters
    pub async fn insert_trip(&self, trip: Trip) {
        let mut state = self.state.write().await;
        state.trips.insert(trip.id, trip);
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[async_trait]
impl TripRepository for InMemoryStore {
    async fn create_trip(&self, new_trip: NewTrip) -> StoreResult<Trip> {
        let trip = Trip::new(new_trip);
        let mut state = self.state.write().await;
        state.trips.insert(trip.id, trip.clone());
        Ok(trip)
    }

    async fn get_trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        let state = self.state.read().await;
        Ok(state.trips.get(&id).cloned())
    }

    async fn list_trips(&self) -> StoreResult<Vec<Trip>> {
        let state = self.state.read().await;
        let mut trips: Vec<Trip> = state.trips.values().cloned().collect();
        newest_first(&mut trips, |t| t.created_at);
        Ok(trips)
    }

    async fn update_trip(&self, id: Uuid, update: &TripUpdate) -> StoreResult<Option<Trip>> {
        let mut state = self.state.write().await;
        let Some(trip) = state.trips.get_mut(&id) else {
            return Ok(None);
        };

        match trip.apply(update) {
            Ok(()) => Ok(Some(trip.clone())),
            Err(TripError::CapacityBelowBooked { requested, booked }) => {
                Err(StoreError::CapacityBelowBooked { requested, booked })
            }
            Err(e) => Err(StoreError::Backend(e.to_string())),
        }
    }
}

#[async_trait]
impl RegistrationRepository for InMemoryStore {
    async fn create_registration(&self, registration: &Registration) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.registrations.insert(registration.id, registration.clone());
        Ok(())
    }

    async fn get_registration(&self, id: Uuid) -> StoreResult<Option<Registration>> {
        let state = self.state.read().await;
        Ok(state.registrations.get(&id).cloned())
    }

    async fn list_registrations(&self, trip_id: Option<Uuid>) -> StoreResult<Vec<Registration>> {
        let state = self.state.read().await;
        let mut registrations: Vec<Registration> = state
            .registrations
            .values()
            .filter(|r| trip_id.is_none_or(|id| r.trip_id == id))
            .cloned()
            .collect();
        newest_first(&mut registrations, |r| r.created_at);
        Ok(registrations)
    }

    async fn fail_registration(
        &self,
        id: Uuid,
        payment_ref: Option<&str>,
        reason: &str,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(registration) = state.registrations.get_mut(&id) else {
            return Ok(false);
        };
        Ok(registration.fail(payment_ref, reason).is_ok())
    }

    async fn confirm_registration(&self, id: Uuid, payment_ref: &str) -> StoreResult<ConfirmOutcome> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let Some(registration) = state.registrations.get_mut(&id) else {
            return Ok(ConfirmOutcome::NotFound);
        };
        if registration.payment_status != PaymentStatus::Pending {
            return Ok(ConfirmOutcome::NotPending(registration.payment_status));
        }

        let claimed = state
            .trips
            .get_mut(&registration.trip_id)
            .and_then(|trip| trip.claim_slot().ok());

        match claimed {
            Some(booked_slots) => {
                registration
                    .complete(payment_ref)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok(ConfirmOutcome::Confirmed { booked_slots })
            }
            None => {
                registration
                    .fail(Some(payment_ref), NO_SLOT_REASON)
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                Ok(ConfirmOutcome::NoSlot)
            }
        }
    }

    async fn delete_registration(&self, id: Uuid) -> StoreResult<Option<Registration>> {
        let mut state = self.state.write().await;
        let Some(registration) = state.registrations.remove(&id) else {
            return Ok(None);
        };

        if registration.holds_slot() {
            if let Some(trip) = state.trips.get_mut(&registration.trip_id) {
                trip.release_slot();
            }
        }
        Ok(Some(registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trailhead_catalog::TripStatus;
    use trailhead_core::NewRegistration;
    use trailhead_shared::Masked;

    async fn seed_trip(store: &InMemoryStore, total_slots: i32) -> Trip {
        store
            .create_trip(NewTrip {
                title: "Valley of Flowers".to_string(),
                total_slots,
                booking_fee: 50,
                status: Some(TripStatus::BookingOpen),
            })
            .await
            .unwrap()
    }

    async fn seed_registration(store: &InMemoryStore, trip_id: Uuid) -> Registration {
        let id = Uuid::new_v4();
        let registration = Registration::pending(NewRegistration {
            id,
            trip_id,
            name: "Ravi".to_string(),
            phone: Masked::new("9876543210".to_string()),
            queries: String::new(),
            amount_paid: 50,
            order_ref: format!("order_{}", id.simple()),
        });
        store.create_registration(&registration).await.unwrap();
        registration
    }

    #[tokio::test]
    async fn test_confirm_claims_slot_once() {
        let store = InMemoryStore::new();
        let trip = seed_trip(&store, 2).await;
        let reg = seed_registration(&store, trip.id).await;

        let first = store.confirm_registration(reg.id, "pay_1").await.unwrap();
        assert_eq!(first, ConfirmOutcome::Confirmed { booked_slots: 1 });

        let second = store.confirm_registration(reg.id, "pay_1").await.unwrap();
        assert_eq!(second, ConfirmOutcome::NotPending(PaymentStatus::Completed));

        let trip = store.get_trip(trip.id).await.unwrap().unwrap();
        assert_eq!(trip.booked_slots, 1);
    }

    #[tokio::test]
    async fn test_confirm_without_slot_marks_failed() {
        let store = InMemoryStore::new();
        let trip = seed_trip(&store, 1).await;
        let a = seed_registration(&store, trip.id).await;
        let b = seed_registration(&store, trip.id).await;

        store.confirm_registration(a.id, "pay_a").await.unwrap();
        let outcome = store.confirm_registration(b.id, "pay_b").await.unwrap();
        assert_eq!(outcome, ConfirmOutcome::NoSlot);

        let b = store.get_registration(b.id).await.unwrap().unwrap();
        assert_eq!(b.payment_status, PaymentStatus::Failed);
        assert_eq!(b.payment_ref.as_deref(), Some("pay_b"));
        assert_eq!(b.failure_reason.as_deref(), Some(NO_SLOT_REASON));
        assert_eq!(store.get_trip(trip.id).await.unwrap().unwrap().booked_slots, 1);
    }

    #[tokio::test]
    async fn test_concurrent_confirms_never_overbook() {
        let store = InMemoryStore::new();
        let trip = seed_trip(&store, 3).await;

        let mut ids = Vec::new();
        for _ in 0..10 {
            ids.push(seed_registration(&store, trip.id).await.id);
        }

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let store = store.clone();
                tokio::spawn(async move { store.confirm_registration(id, "pay").await.unwrap() })
            })
            .collect();

        let mut confirmed = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), ConfirmOutcome::Confirmed { .. }) {
                confirmed += 1;
            }
        }

        assert_eq!(confirmed, 3);
        let completed = store
            .list_registrations(Some(trip.id))
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.holds_slot())
            .count();
        assert_eq!(completed, 3);
        assert_eq!(store.get_trip(trip.id).await.unwrap().unwrap().booked_slots, 3);
    }

    #[tokio::test]
    async fn test_delete_returns_slot_only_for_completed() {
        let store = InMemoryStore::new();
        let trip = seed_trip(&store, 2).await;
        let done = seed_registration(&store, trip.id).await;
        let pending = seed_registration(&store, trip.id).await;
        store.confirm_registration(done.id, "pay").await.unwrap();

        store.delete_registration(pending.id).await.unwrap().unwrap();
        assert_eq!(store.get_trip(trip.id).await.unwrap().unwrap().booked_slots, 1);

        store.delete_registration(done.id).await.unwrap().unwrap();
        assert_eq!(store.get_trip(trip.id).await.unwrap().unwrap().booked_slots, 0);

        assert!(store.delete_registration(done.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_fail_only_from_pending() {
        let store = InMemoryStore::new();
        let trip = seed_trip(&store, 2).await;
        let reg = seed_registration(&store, trip.id).await;

        assert!(store.fail_registration(reg.id, None, "invalid signature").await.unwrap());
        assert!(!store.fail_registration(reg.id, None, "again").await.unwrap());
        assert!(!store.fail_registration(Uuid::new_v4(), None, "missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_guards_capacity() {
        let store = InMemoryStore::new();
        let trip = seed_trip(&store, 2).await;
        let reg = seed_registration(&store, trip.id).await;
        store.confirm_registration(reg.id, "pay").await.unwrap();

        let shrink = TripUpdate { total_slots: Some(0), ..Default::default() };
        assert!(store.update_trip(trip.id, &shrink).await.is_err());

        let shrink = TripUpdate { total_slots: Some(1), ..Default::default() };
        let updated = store.update_trip(trip.id, &shrink).await.unwrap().unwrap();
        assert_eq!(updated.total_slots, 1);
        assert_eq!(updated.booked_slots, 1);

        assert!(store.update_trip(Uuid::new_v4(), &shrink).await.unwrap().is_none());
    }
}
