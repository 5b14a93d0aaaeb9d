use axum::{
    extract::{Extension, Path},
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::booking_model::BookingRequest;
use crate::reservation::NewBooking;
use crate::state::AppState;
use crate::utils::parse_object_id;

/// Holds the selected seats and answers with the checkout URL to redirect to.
pub async fn create_booking(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<Value>, AppError> {
    let show_id = parse_object_id(&request.show_id)?;

    let created = state
        .reservations
        .create(NewBooking {
            show_id,
            seats: request.selected_seats,
            user_id: user.user_id,
            origin: state.config.app_url.clone(),
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "url": created.payment_url,
        "bookingId": created.booking_id.to_hex(),
    })))
}

pub async fn get_occupied_seats(
    Path(show_id): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let show_id = parse_object_id(&show_id)?;
    let occupied_seats = state.reservations.occupied_seats(show_id).await?;
    Ok(Json(json!({ "success": true, "occupiedSeats": occupied_seats })))
}
