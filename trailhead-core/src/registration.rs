use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trailhead_shared::Masked;
use uuid::Uuid;

use crate::payment::PaymentStatus;

/// One booking attempt for a trip
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub name: String,
    pub phone: Masked<String>,
    pub queries: String,
    pub payment_status: PaymentStatus,
    /// Trip fee at initiation time; later fee edits do not change it
    pub amount_paid: i64,
    pub order_ref: String,
    pub payment_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything needed to open a Pending registration
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub name: String,
    pub phone: Masked<String>,
    pub queries: String,
    pub amount_paid: i64,
    pub order_ref: String,
}

impl Registration {
    pub fn pending(new: NewRegistration) -> Self {
        let now = Utc::now();
        Self {
            id: new.id,
            trip_id: new.trip_id,
            name: new.name,
            phone: new.phone,
            queries: new.queries,
            payment_status: PaymentStatus::Pending,
            amount_paid: new.amount_paid,
            order_ref: new.order_ref,
            payment_ref: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition: Pending → Completed (payment verified)
    pub fn complete(&mut self, payment_ref: &str) -> Result<(), LedgerError> {
        self.ensure_pending(PaymentStatus::Completed)?;
        self.payment_status = PaymentStatus::Completed;
        self.payment_ref = Some(payment_ref.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition: Pending → Failed. The payment reference is kept when known.
    pub fn fail(&mut self, payment_ref: Option<&str>, reason: &str) -> Result<(), LedgerError> {
        self.ensure_pending(PaymentStatus::Failed)?;
        self.payment_status = PaymentStatus::Failed;
        if let Some(payment_ref) = payment_ref {
            self.payment_ref = Some(payment_ref.to_string());
        }
        self.failure_reason = Some(reason.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Whether this registration currently holds one of the trip's slots
    pub fn holds_slot(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    fn ensure_pending(&self, to: PaymentStatus) -> Result<(), LedgerError> {
        if self.payment_status != PaymentStatus::Pending {
            return Err(LedgerError::InvalidTransition {
                from: self.payment_status,
                to,
            });
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid payment status transition from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
}
