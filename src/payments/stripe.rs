//! Stripe integration via REST API (no SDK dependency)

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::StripeConfig;

use super::{CheckoutRequest, PaymentError, PaymentGateway, SignatureError};

/// Stripe's default replay window for webhook timestamps.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Self {
        StripeGateway {
            client: reqwest::Client::new(),
            secret_key: config.secret_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }
}

fn checkout_form(checkout: &CheckoutRequest) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "payment".to_string()),
        ("success_url", checkout.success_url.clone()),
        ("cancel_url", checkout.cancel_url.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", checkout.currency.clone()),
        ("line_items[0][price_data][unit_amount]", checkout.amount_cents.to_string()),
        ("line_items[0][price_data][product_data][name]", checkout.product_name.clone()),
        ("line_items[0][price_data][product_data][description]", checkout.description.clone()),
        ("metadata[bookingId]", checkout.booking_id.clone()),
        ("payment_intent_data[metadata][bookingId]", checkout.booking_id.clone()),
    ]
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(&self, checkout: &CheckoutRequest) -> Result<String, PaymentError> {
        let resp: serde_json::Value = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&checkout_form(checkout))
            .send()
            .await?
            .json()
            .await?;

        resp["url"].as_str().map(String::from).ok_or_else(|| {
            let message = resp["error"]["message"].as_str().unwrap_or("no checkout url returned");
            PaymentError::Rejected(message.to_string())
        })
    }
}

/// Verify a `Stripe-Signature` header (HMAC-SHA256 over `"{t}.{payload}"`).
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        if let Some(t) = part.trim().strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(v) = part.trim().strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::MalformedHeader)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Stripe lists one v1 entry per active secret during rotation
    let matched = signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sign_for_test(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}
