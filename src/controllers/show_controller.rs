use axum::{
    extract::{Extension, Path},
    response::Json,
};
use mongodb::bson::{oid::ObjectId, DateTime};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::{
    movie_model::MovieResponse,
    show_model::{NewShow, Show, ShowDetail, ShowResponse},
};
use crate::state::AppState;
use crate::utils::parse_object_id;

/// Attaches each show's movie, replacing a `$lookup` on `movies`.
pub async fn with_movies(state: &AppState, shows: &[Show]) -> Result<Vec<ShowDetail>, AppError> {
    let mut movie_ids: Vec<ObjectId> = shows.iter().map(|s| s.movie_id).collect();
    movie_ids.sort();
    movie_ids.dedup();

    let movies: HashMap<ObjectId, MovieResponse> = state
        .movies
        .find_movies(&movie_ids)
        .await?
        .into_iter()
        .filter_map(|movie| movie.id.map(|id| (id, MovieResponse::from(movie))))
        .collect();

    Ok(shows
        .iter()
        .map(|show| ShowDetail {
            show: ShowResponse::from(show),
            movie: movies.get(&show.movie_id).cloned(),
        })
        .collect())
}

pub async fn load_shows(Extension(state): Extension<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let shows = state.shows.list_shows().await?;
    let details = with_movies(&state, &shows).await?;
    Ok(Json(json!({ "success": true, "shows": details })))
}

pub async fn fetch_show_by_id(
    Path(id_str): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let id = parse_object_id(&id_str)?;

    let show = state
        .shows
        .find_show(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Show not found".to_string()))?;
    let mut details = with_movies(&state, std::slice::from_ref(&show)).await?;

    Ok(Json(json!({ "success": true, "show": details.pop() })))
}

pub async fn add_show(
    AdminUser(admin): AdminUser,
    Extension(state): Extension<Arc<AppState>>,
    Json(new_show): Json<NewShow>,
) -> Result<Json<Value>, AppError> {
    let movie_id = parse_object_id(&new_show.movie_id)?;
    if !new_show.show_price.is_finite() || new_show.show_price <= 0.0 {
        return Err(AppError::BadRequest("Show price must be positive".to_string()));
    }
    if state.movies.find_movie(movie_id).await?.is_none() {
        return Err(AppError::NotFound("Movie not found".to_string()));
    }

    let mut show = Show {
        id: None,
        movie_id,
        show_date_time: DateTime::from_chrono(new_show.show_date_time),
        show_price: new_show.show_price,
        occupied_seats: Default::default(),
    };
    show.id = Some(state.shows.insert_show(&show).await?);

    tracing::info!(show_id = ?show.id, movie_id = %movie_id, admin = %admin.user_id, "Show added");
    Ok(Json(json!({
        "success": true,
        "message": "Show added successfully",
        "show": ShowResponse::from(&show),
    })))
}
