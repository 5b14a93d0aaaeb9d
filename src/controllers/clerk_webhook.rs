//! POST /api/clerk: keeps the local `users` collection in step with the identity provider.

use axum::{
    body::Bytes,
    extract::Extension,
    http::HeaderMap,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::identity::{verify_svix_signature, UserEvent};
use crate::state::AppState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {name} header")))
}

/// Store failures surface as 500 so the provider redelivers the event.
pub async fn clerk_webhooks(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let msg_id = header(&headers, "svix-id")?;
    let timestamp = header(&headers, "svix-timestamp")?;
    let signature = header(&headers, "svix-signature")?;

    let now = chrono::Utc::now().timestamp();
    verify_svix_signature(&body, msg_id, timestamp, signature, &state.config.clerk.webhook_secret, now).map_err(|e| {
        tracing::warn!(msg_id = %msg_id, error = %e, "Clerk signature verification failed");
        AppError::BadRequest(format!("Webhook Error: {e}"))
    })?;

    let event = UserEvent::parse(&body).map_err(|e| {
        tracing::warn!(msg_id = %msg_id, error = %e, "Failed to parse Clerk event");
        AppError::BadRequest(format!("Webhook Error: {e}"))
    })?;

    match event {
        UserEvent::Created(user) => {
            let created = state.users.create_user_if_absent(&user).await?;
            tracing::info!(user_id = %user.id, created, "user.created handled");
        }
        UserEvent::Updated(user) => {
            if !state.users.update_user_profile(&user).await? {
                // The matching user.created may have been lost.
                state.users.create_user_if_absent(&user).await?;
            }
            tracing::info!(user_id = %user.id, "user.updated handled");
        }
        UserEvent::Deleted(user_id) => {
            let deleted = state.users.delete_user(&user_id).await?;
            tracing::info!(user_id = %user_id, deleted, "user.deleted handled");
        }
        UserEvent::Ignored(kind) => {
            tracing::debug!(event_type = %kind, "Unhandled Clerk event type");
        }
    }

    Ok(Json(json!({ "success": true, "message": "Webhook received" })))
}
