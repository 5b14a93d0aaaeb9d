//! Identity provider (Clerk) webhook verification and user events.
//!
//! Clerk delivers webhooks through Svix: the signed content is
//! `"{svix-id}.{svix-timestamp}.{body}"`, HMAC-SHA256 keyed with the base64 part of the
//! `whsec_` secret, and `svix-signature` holds space separated `v1,<base64>` entries.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::models::user_model::User;
use crate::payments::SignatureError;

const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub fn verify_svix_signature(
    payload: &[u8],
    msg_id: &str,
    timestamp: &str,
    signature_header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let key = STANDARD
        .decode(secret.strip_prefix("whsec_").unwrap_or(secret))
        .map_err(|_| SignatureError::InvalidSecret)?;
    let ts: i64 = timestamp.parse().map_err(|_| SignatureError::MalformedHeader)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = signature_header
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|sig| STANDARD.decode(sig).ok())
        .any(|sig| mac.clone().verify_slice(&sig).is_ok());
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
struct RawUserEvent {
    #[serde(rename = "type")]
    kind: String,
    data: ClerkUser,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    email_address: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserEvent {
    Created(User),
    Updated(User),
    Deleted(String),
    Ignored(String),
}

#[derive(Debug, thiserror::Error)]
pub enum UserEventError {
    #[error("malformed user event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("user {0} has no email address")]
    NoEmail(String),
}

impl ClerkUser {
    fn into_user(self) -> Result<User, UserEventError> {
        let email = self
            .email_addresses
            .into_iter()
            .next()
            .map(|e| e.email_address)
            .ok_or_else(|| UserEventError::NoEmail(self.id.clone()))?;
        let name = format!(
            "{} {}",
            self.first_name.unwrap_or_default(),
            self.last_name.unwrap_or_default()
        )
        .trim()
        .to_string();

        Ok(User {
            id: self.id,
            email,
            name,
            image: self.image_url,
            favourites: Vec::new(),
        })
    }
}

impl UserEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, UserEventError> {
        let event: RawUserEvent = serde_json::from_slice(payload)?;
        match event.kind.as_str() {
            "user.created" => Ok(UserEvent::Created(event.data.into_user()?)),
            "user.updated" => Ok(UserEvent::Updated(event.data.into_user()?)),
            "user.deleted" => Ok(UserEvent::Deleted(event.data.id)),
            _ => Ok(UserEvent::Ignored(event.kind)),
        }
    }
}

#[cfg(test)]
pub(crate) fn svix_sign_for_test(payload: &[u8], msg_id: &str, timestamp: i64, secret: &str) -> String {
    let key = STANDARD.decode(secret.trim_start_matches("whsec_")).unwrap();
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
    mac.update(format!("{msg_id}.{timestamp}.").as_bytes());
    mac.update(payload);
    format!("v1,{}", STANDARD.encode(mac.finalize().into_bytes()))
}
