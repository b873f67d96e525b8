use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use trailhead_booking::BookingError;
use trailhead_catalog::TripError;
use trailhead_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    AuthenticationError(String),
    #[error("{0}")]
    AuthorizationError(String),
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{0}")]
    ConflictError(String),
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("{0}")]
    InternalServerError(String),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "UNAUTHENTICATED"),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            AppError::ValidationError(_) => (StatusCode::BAD_REQUEST, "VALIDATION"),
            AppError::NotFoundError(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::ConflictError(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::InternalServerError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
            AppError::Booking(err) => {
                let status = match err {
                    BookingError::Validation(_) | BookingError::InvalidSignature => StatusCode::BAD_REQUEST,
                    BookingError::NotFound(_) => StatusCode::NOT_FOUND,
                    BookingError::InvalidState(_) | BookingError::CapacityExceeded(_) => StatusCode::CONFLICT,
                    BookingError::Gateway(_) => StatusCode::BAD_GATEWAY,
                    BookingError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Internal Server Error: {}", self);
            "Internal Server Error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "code": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::CapacityBelowBooked { .. } => AppError::ConflictError(err.to_string()),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<TripError> for AppError {
    fn from(err: TripError) -> Self {
        match err {
            TripError::CapacityBelowBooked { .. } => AppError::ConflictError(err.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}
