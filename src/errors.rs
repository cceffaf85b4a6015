use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;

use crate::models::{BookingStatus, TimeSlot};

/// Failures of the slot, availability and booking operations.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("booking store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("{staff_id} is no longer free on {date} at {slot}, please pick another slot or barber")]
    Conflict {
        date: NaiveDate,
        slot: TimeSlot,
        staff_id: String,
    },

    #[error("booking not found: {0}")]
    NotFound(String),

    #[error("invalid booking request: {0}")]
    Validation(String),

    #[error("booking {id} is already {status}")]
    InvalidTransition { id: String, status: BookingStatus },
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("an account with this email already exists")]
    EmailTaken,

    #[error("invalid account details: {0}")]
    Validation(String),

    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Booking(BookingError::StoreUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Booking(BookingError::Conflict { .. }) => StatusCode::CONFLICT,
            AppError::Booking(BookingError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Booking(BookingError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Booking(BookingError::InvalidTransition { .. }) => StatusCode::CONFLICT,
            AppError::Directory(DirectoryError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            AppError::Directory(DirectoryError::EmailTaken) => StatusCode::CONFLICT,
            AppError::Directory(DirectoryError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Directory(DirectoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
