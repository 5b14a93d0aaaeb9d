use mongodb::bson::{oid::ObjectId, DateTime};
use serde::Serializer;

use crate::error::AppError;

pub fn serialize_object_id<S>(id: &Option<ObjectId>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match id {
        Some(id) => serializer.serialize_str(&id.to_hex()),
        None => serializer.serialize_none(),
    }
}

pub fn serialize_object_id_as_hex<S>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&id.to_hex())
}

pub fn serialize_datetime_as_rfc3339<S>(dt: &DateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&dt.to_chrono().to_rfc3339())
}

pub fn parse_object_id(id_str: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(id_str).map_err(|_| AppError::BadRequest(format!("Invalid id: {id_str}")))
}

/// Seat ids end up as field names inside `occupied_seats`, so only short alphanumeric
/// labels such as `A3` or `K12` are accepted.
pub fn validate_seats(seats: &[String]) -> Result<(), String> {
    if seats.is_empty() {
        return Err("No seats selected".to_string());
    }

    for (i, seat) in seats.iter().enumerate() {
        if seat.is_empty() || seat.len() > 8 || !seat.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("Invalid seat id: {seat}"));
        }
        if seats[..i].contains(seat) {
            return Err(format!("Seat {seat} selected more than once"));
        }
    }

    Ok(())
}
