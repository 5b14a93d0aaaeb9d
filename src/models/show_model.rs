use std::collections::BTreeMap;

use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use crate::utils::{serialize_datetime_as_rfc3339, serialize_object_id, serialize_object_id_as_hex};

use super::movie_model::MovieResponse;

/// One screening of a movie.
///
/// `occupied_seats` maps a seat id to the id of the user holding it. A seat missing
/// from the map is free.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Show {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub movie_id: ObjectId,
    pub show_date_time: DateTime,
    pub show_price: f64,
    #[serde(default)]
    pub occupied_seats: BTreeMap<String, String>,
}

impl Show {
    /// The requested seats that someone already holds, in request order.
    pub fn taken_seats(&self, seats: &[String]) -> Vec<String> {
        seats
            .iter()
            .filter(|seat| self.occupied_seats.contains_key(*seat))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShowResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", serialize_with = "serialize_object_id")]
    pub id: Option<ObjectId>,
    #[serde(serialize_with = "serialize_object_id_as_hex")]
    pub movie_id: ObjectId,
    #[serde(serialize_with = "serialize_datetime_as_rfc3339")]
    pub show_date_time: DateTime,
    pub show_price: f64,
    pub occupied_seat_count: usize,
}

impl From<&Show> for ShowResponse {
    fn from(show: &Show) -> Self {
        ShowResponse {
            id: show.id,
            movie_id: show.movie_id,
            show_date_time: show.show_date_time,
            show_price: show.show_price,
            occupied_seat_count: show.occupied_seats.len(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ShowDetail {
    #[serde(flatten)]
    pub show: ShowResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub movie: Option<MovieResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShow {
    pub movie_id: String,
    pub show_date_time: chrono::DateTime<chrono::Utc>,
    pub show_price: f64,
}

/// Result of trying to take a set of seats in one atomic step.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatReservation {
    Reserved,
    Taken(Vec<String>),
    ShowNotFound,
}
