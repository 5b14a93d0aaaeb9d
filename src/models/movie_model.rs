use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::utils::serialize_object_id;

use super::show_model::ShowResponse;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Movie {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub duration: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

#[derive(Debug, Serialize, Clone)]
pub struct MovieResponse {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none", serialize_with = "serialize_object_id")]
    pub id: Option<ObjectId>,
    pub title: String,
    pub duration: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
}

impl From<Movie> for MovieResponse {
    fn from(movie: Movie) -> Self {
        MovieResponse {
            id: movie.id,
            title: movie.title,
            duration: movie.duration,
            description: movie.description,
            poster: movie.poster,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: MovieResponse,
    pub shows: Vec<ShowResponse>,
}

#[derive(Debug, Deserialize)]
pub struct NewMovie {
    pub title: String,
    pub duration: i32,
    pub description: Option<String>,
    pub poster: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub duration: Option<i32>,
    pub description: Option<String>,
    pub poster: Option<String>,
}
