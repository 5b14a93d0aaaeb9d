use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::utils::{serialize_datetime_as_rfc3339, serialize_object_id, serialize_object_id_as_hex};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: String,
    pub show: ObjectId,
    pub amount: f64,
    pub booked_seats: Vec<String>,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub payment_link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent: Option<String>,
    /// Set once the release job has claimed the booking; a claimed booking can no longer
    /// be paid and is deleted as soon as its seats are freed.
    #[serde(default)]
    pub expired: bool,
    /// Set by the release job once the seats are back on sale, so a retried release
    /// does not free them again.
    #[serde(default)]
    pub seats_released: bool,
    /// Claimed before the confirmation email goes out.
    #[serde(default)]
    pub confirmation_sent: bool,
    pub created_at: DateTime,
}

impl Booking {
    pub fn new(user: &str, show: ObjectId, amount: f64, booked_seats: Vec<String>) -> Self {
        Booking {
            id: None,
            user: user.to_string(),
            show,
            amount,
            booked_seats,
            is_paid: false,
            payment_link: String::new(),
            payment_intent: None,
            expired: false,
            seats_released: false,
            confirmation_sent: false,
            created_at: DateTime::now(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", serialize_with = "serialize_object_id")]
    pub id: Option<ObjectId>,
    pub user: String,
    #[serde(serialize_with = "serialize_object_id_as_hex")]
    pub show: ObjectId,
    pub amount: f64,
    pub booked_seats: Vec<String>,
    pub is_paid: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub payment_link: String,
    #[serde(serialize_with = "serialize_datetime_as_rfc3339")]
    pub created_at: DateTime,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        BookingResponse {
            id: booking.id,
            user: booking.user,
            show: booking.show,
            amount: booking.amount,
            booked_seats: booking.booked_seats,
            is_paid: booking.is_paid,
            payment_link: booking.payment_link,
            created_at: booking.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub show_id: String,
    pub selected_seats: Vec<String>,
}
