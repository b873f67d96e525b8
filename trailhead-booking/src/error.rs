use trailhead_catalog::SlotError;
use trailhead_core::{GatewayError, StoreError};

/// Failures of the booking flow, one variant per error kind callers see
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    CapacityExceeded(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("invalid payment signature")]
    InvalidSignature,

    #[error("internal error: {0}")]
    Internal(String),
}

impl BookingError {
    /// Stable machine-readable kind
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Validation(_) => "VALIDATION",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::InvalidState(_) => "INVALID_STATE",
            BookingError::CapacityExceeded(_) => "CAPACITY_EXCEEDED",
            BookingError::Gateway(_) => "GATEWAY_ERROR",
            BookingError::InvalidSignature => "INVALID_SIGNATURE",
            BookingError::Internal(_) => "INTERNAL",
        }
    }
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        BookingError::Internal(err.to_string())
    }
}

impl From<SlotError> for BookingError {
    fn from(err: SlotError) -> Self {
        match err {
            SlotError::BookingClosed(_) => BookingError::InvalidState("booking closed".to_string()),
            SlotError::FullyBooked { .. } => BookingError::CapacityExceeded("fully booked".to_string()),
        }
    }
}
