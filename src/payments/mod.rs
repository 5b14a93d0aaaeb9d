//! Payment gateway seam and the webhook events the booking flow reacts to.

use async_trait::async_trait;
use serde::Deserialize;

pub mod stripe;

pub use stripe::{verify_webhook_signature, StripeGateway};

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("request to payment provider failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("payment provider rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SignatureError {
    #[error("missing signature header")]
    MissingHeader,

    #[error("malformed signature header")]
    MalformedHeader,

    #[error("invalid signing secret")]
    InvalidSecret,

    #[error("signature mismatch")]
    Mismatch,

    #[error("timestamp outside tolerance")]
    Expired,
}

/// What the gateway needs to open a hosted checkout page for one booking.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    pub booking_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub product_name: String,
    pub description: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the URL of the hosted checkout page.
    async fn create_checkout_session(&self, checkout: &CheckoutRequest) -> Result<String, PaymentError>;
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    /// Either `checkout.session.completed` or `payment_intent.succeeded`; both mean the
    /// booking has been paid.
    Succeeded {
        event_id: String,
        kind: String,
        booking_id: Option<String>,
        payment_intent: Option<String>,
    },
    Ignored { event_id: String, kind: String },
}

impl PaymentEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let event: RawEvent = serde_json::from_slice(payload)?;
        let object = &event.data.object;
        let booking_id = object["metadata"]["bookingId"].as_str().map(String::from);

        let payment_intent = match event.kind.as_str() {
            "checkout.session.completed" => object["payment_intent"].as_str().map(String::from),
            "payment_intent.succeeded" => object["id"].as_str().map(String::from),
            _ => {
                return Ok(PaymentEvent::Ignored {
                    event_id: event.id,
                    kind: event.kind,
                })
            }
        };

        Ok(PaymentEvent::Succeeded {
            event_id: event.id,
            kind: event.kind,
            booking_id,
            payment_intent,
        })
    }
}
