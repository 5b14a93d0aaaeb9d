use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::payments::PaymentError;
use crate::reservation::ReservationError;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Selected seats are not available: {}", .0.join(", "))]
    SeatUnavailable(Vec<String>),

    #[error("{0}")]
    BadRequest(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Admin access required")]
    Forbidden,

    #[error("payment gateway error: {0}")]
    Payment(#[from] PaymentError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::SeatUnavailable(_) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Payment(_) => StatusCode::BAD_GATEWAY,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            AppError::Payment(e) => {
                tracing::error!(error = %e, "Payment gateway failure");
                "Payment provider unavailable, please try again".to_string()
            }
            AppError::Store(e) => {
                tracing::error!(error = %e, "Store failure");
                "Internal Server Error".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::ShowNotFound => AppError::NotFound("Show not found".to_string()),
            ReservationError::SeatUnavailable(seats) => AppError::SeatUnavailable(seats),
            ReservationError::InvalidSeats(msg) => AppError::BadRequest(msg),
            ReservationError::Store(e) => AppError::Store(e),
            ReservationError::Payment(e) => AppError::Payment(e),
        }
    }
}
