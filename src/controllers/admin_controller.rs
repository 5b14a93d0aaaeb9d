use axum::{extract::Extension, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::controllers::user_controller::with_shows;
use crate::error::AppError;
use crate::state::AppState;

pub async fn is_admin(_admin: AdminUser) -> Json<Value> {
    Json(json!({ "success": true, "isAdmin": true }))
}

pub async fn all_bookings(
    _admin: AdminUser,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.bookings.list_bookings().await?;
    let bookings = with_shows(&state, bookings).await?;
    Ok(Json(json!({ "success": true, "bookings": bookings })))
}
