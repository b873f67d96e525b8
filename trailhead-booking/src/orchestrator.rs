use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use trailhead_core::payment::to_minor_units;
use trailhead_core::signature::verify_signature;
use trailhead_core::{
    ConfirmOutcome, GatewayOrder, NewRegistration, PaymentGateway, PaymentStatus, Registration,
    RegistrationRepository, TripRepository,
};
use trailhead_shared::Masked;
use uuid::Uuid;

use crate::error::BookingError;

const INVALID_SIGNATURE_REASON: &str = "invalid signature";

/// Checkout request, already deserialized at the boundary
#[derive(Debug, Clone)]
pub struct InitiateBooking {
    pub trip_id: Uuid,
    pub name: String,
    pub phone: Masked<String>,
    pub queries: String,
}

impl InitiateBooking {
    pub fn validate(&self) -> Result<(), BookingError> {
        if self.name.trim().is_empty() {
            return Err(BookingError::Validation("name is required".to_string()));
        }

        let phone = self.phone.expose().trim();
        let digits = phone.chars().filter(char::is_ascii_digit).count();
        let allowed = phone
            .char_indices()
            .all(|(i, c)| c.is_ascii_digit() || c == ' ' || c == '-' || (i == 0 && c == '+'));
        if !allowed || !(7..=15).contains(&digits) {
            return Err(BookingError::Validation("phone must have 7 to 15 digits".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingInitiated {
    pub order: GatewayOrder,
    pub registration_id: Uuid,
}

/// Gateway callback echoed back by the checkout client
#[derive(Debug, Clone)]
pub struct VerifyPayment {
    pub registration_id: Uuid,
    pub order_ref: String,
    pub payment_ref: String,
    pub signature: String,
}

#[derive(Debug, Clone)]
pub struct PaymentVerified {
    pub registration_id: Uuid,
    /// True when this call repeated an earlier successful verification
    pub already_confirmed: bool,
}

/// Coordinates the trip catalog, the registration ledger and the payment
/// gateway. It is the only writer of `Trip::booked_slots`, and only through
/// the repository's atomic confirm/delete operations.
pub struct BookingOrchestrator {
    trips: Arc<dyn TripRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    gateway: Arc<dyn PaymentGateway>,
    gateway_secret: Masked<String>,
    currency: String,
}

impl BookingOrchestrator {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        registrations: Arc<dyn RegistrationRepository>,
        gateway: Arc<dyn PaymentGateway>,
        gateway_secret: String,
        currency: String,
    ) -> Self {
        Self {
            trips,
            registrations,
            gateway,
            gateway_secret: Masked::new(gateway_secret),
            currency,
        }
    }

    /// Start checkout: check the trip, create a gateway order and open a
    /// Pending registration. Capacity is checked here, not reserved.
    pub async fn initiate(&self, req: InitiateBooking) -> Result<BookingInitiated, BookingError> {
        req.validate()?;

        let trip = self
            .trips
            .get_trip(req.trip_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("trip".to_string()))?;
        trip.ensure_bookable()?;

        let amount = to_minor_units(trip.booking_fee).ok_or_else(|| {
            BookingError::Internal(format!("booking fee {} overflows minor units", trip.booking_fee))
        })?;

        let registration_id = Uuid::new_v4();
        let receipt = format!("rcpt_{}", registration_id.simple());
        let order = self
            .gateway
            .create_order(amount, &self.currency, &receipt)
            .await
            .map_err(|e| {
                warn!("Order creation failed for trip {}: {}", trip.id, e);
                BookingError::Gateway(e)
            })?;

        let registration = Registration::pending(NewRegistration {
            id: registration_id,
            trip_id: trip.id,
            name: req.name.trim().to_string(),
            phone: Masked::new(req.phone.expose().trim().to_string()),
            queries: req.queries,
            amount_paid: trip.booking_fee,
            order_ref: order.id.clone(),
        });
        self.registrations.create_registration(&registration).await?;

        info!(
            "Registration {} pending for trip {} (order {}, phone {})",
            registration.id, trip.id, order.id, registration.phone
        );

        Ok(BookingInitiated { order, registration_id })
    }

    /// Check the gateway callback and, when genuine, confirm the registration
    /// and claim a slot in one atomic store operation.
    pub async fn verify(&self, req: VerifyPayment) -> Result<PaymentVerified, BookingError> {
        let registration = self
            .registrations
            .get_registration(req.registration_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("registration".to_string()))?;

        let genuine = req.order_ref == registration.order_ref
            && verify_signature(
                &req.order_ref,
                &req.payment_ref,
                &req.signature,
                self.gateway_secret.expose(),
            );

        if registration.payment_status.is_terminal() {
            return Self::finalized(&registration, genuine, &req.payment_ref);
        }

        if !genuine {
            warn!("Signature mismatch for registration {}", registration.id);
            let failed = self
                .registrations
                .fail_registration(registration.id, None, INVALID_SIGNATURE_REASON)
                .await?;
            if !failed {
                // Finalized by another verification since it was read
                return self.refinalized(registration.id, genuine, &req.payment_ref).await;
            }
            return Err(BookingError::InvalidSignature);
        }

        match self
            .registrations
            .confirm_registration(registration.id, &req.payment_ref)
            .await?
        {
            ConfirmOutcome::Confirmed { booked_slots } => {
                info!(
                    "Registration {} completed; trip {} now has {} booked slots",
                    registration.id, registration.trip_id, booked_slots
                );
                Ok(PaymentVerified {
                    registration_id: registration.id,
                    already_confirmed: false,
                })
            }
            ConfirmOutcome::NoSlot => {
                warn!(
                    "Registration {} paid ({}) but trip {} is full; refund required",
                    registration.id, req.payment_ref, registration.trip_id
                );
                Err(BookingError::CapacityExceeded("fully booked".to_string()))
            }
            ConfirmOutcome::NotPending(_) => {
                // Lost a race with another verification of the same registration
                self.refinalized(registration.id, genuine, &req.payment_ref).await
            }
            ConfirmOutcome::NotFound => Err(BookingError::NotFound("registration".to_string())),
        }
    }

    async fn refinalized(
        &self,
        registration_id: Uuid,
        genuine: bool,
        payment_ref: &str,
    ) -> Result<PaymentVerified, BookingError> {
        let current = self
            .registrations
            .get_registration(registration_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("registration".to_string()))?;
        Self::finalized(&current, genuine, payment_ref)
    }

    /// A repeat of the verification that completed the registration is
    /// answered as success; anything else against a finalized one is refused.
    fn finalized(
        registration: &Registration,
        genuine: bool,
        payment_ref: &str,
    ) -> Result<PaymentVerified, BookingError> {
        let repeat = registration.payment_status == PaymentStatus::Completed
            && genuine
            && registration.payment_ref.as_deref() == Some(payment_ref);

        if repeat {
            return Ok(PaymentVerified {
                registration_id: registration.id,
                already_confirmed: true,
            });
        }
        Err(BookingError::InvalidState(format!(
            "registration already {}",
            registration.payment_status.as_str().to_lowercase()
        )))
    }

    /// Admin removal; a Completed registration gives its slot back
    pub async fn delete(&self, registration_id: Uuid) -> Result<Registration, BookingError> {
        let removed = self
            .registrations
            .delete_registration(registration_id)
            .await?
            .ok_or_else(|| BookingError::NotFound("registration".to_string()))?;

        info!(
            "Registration {} ({}) deleted from trip {}",
            removed.id, removed.payment_status, removed.trip_id
        );
        Ok(removed)
    }
}
