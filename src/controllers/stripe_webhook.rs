//! POST /api/stripe: payment events (raw body for signature verification)

use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use mongodb::bson::oid::ObjectId;
use serde_json::json;
use std::sync::Arc;

use crate::payments::{verify_webhook_signature, PaymentEvent};
use crate::state::AppState;

fn reject(message: String) -> Response {
    (StatusCode::BAD_REQUEST, format!("Webhook Error: {message}")).into_response()
}

/// Once the signature checks out the event is always acknowledged, even when handling
/// it fails, so Stripe does not keep redelivering it.
pub async fn stripe_webhooks(
    Extension(state): Extension<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(sig_header) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        tracing::warn!("Missing Stripe-Signature header");
        return reject("missing Stripe-Signature header".to_string());
    };

    let now = chrono::Utc::now().timestamp();
    if let Err(e) = verify_webhook_signature(&body, sig_header, &state.config.stripe.webhook_secret, now) {
        tracing::warn!(error = %e, "Stripe signature verification failed");
        return reject(e.to_string());
    }

    let event = match PaymentEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse Stripe event");
            return reject(e.to_string());
        }
    };

    match event {
        PaymentEvent::Succeeded {
            event_id,
            kind,
            booking_id,
            payment_intent,
        } => {
            tracing::info!(event_id = %event_id, event_type = %kind, booking_id = ?booking_id, "Payment succeeded");
            handle_payment_succeeded(&state, booking_id.as_deref(), payment_intent.as_deref()).await;
        }
        PaymentEvent::Ignored { event_id, kind } => {
            tracing::debug!(event_id = %event_id, event_type = %kind, "Unhandled Stripe event type");
        }
    }

    (StatusCode::OK, Json(json!({ "received": true }))).into_response()
}

async fn handle_payment_succeeded(state: &AppState, booking_id: Option<&str>, payment_intent: Option<&str>) {
    let Some(booking_id) = booking_id else {
        tracing::warn!("No bookingId in Stripe metadata");
        return;
    };
    let Ok(booking_id) = ObjectId::parse_str(booking_id) else {
        tracing::warn!(booking_id = %booking_id, "Malformed bookingId in Stripe metadata");
        return;
    };

    if let Err(e) = state.reservations.confirm_payment(booking_id, payment_intent).await {
        tracing::error!(booking_id = %booking_id, error = %e, "Error marking booking paid");
    }
}
