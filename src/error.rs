use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{BookingStatus, VerificationStatus};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("No business profile for provider {0}")]
    ProviderProfileNotFound(Uuid),

    #[error("Provider is not verified (status: {0})")]
    ProviderNotVerified(VerificationStatus),

    #[error("Cannot transition booking from {from} to {to}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },

    #[error("Service duration must be a positive number of minutes, got {0}")]
    InvalidDuration(i32),

    #[error("Date {date} is outside the booking window ({earliest} to {latest})")]
    OutOfRangeDate {
        date: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    },

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Integration error: {0}")]
    Integration(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Database(ref msg) => {
                tracing::error!("Database error: {}", msg);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Database error occurred" })),
                )
                    .into_response();
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response();
            }
            AppError::Integration(ref msg) => {
                tracing::error!("Integration error: {}", msg);
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({ "error": "Downstream service unavailable" })),
                )
                    .into_response();
            }
            AppError::NotFound(_)
            | AppError::ServiceNotFound(_)
            | AppError::BookingNotFound(_)
            | AppError::ProviderProfileNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ProviderNotVerified(_) => StatusCode::FORBIDDEN,
            AppError::InvalidTransition { .. }
            | AppError::InvalidDuration(_)
            | AppError::OutOfRangeDate { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}
