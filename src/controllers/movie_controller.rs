use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::{
    movie_model::{Movie, MovieDetail, MovieResponse, MovieUpdate, NewMovie},
    show_model::ShowResponse,
};
use crate::state::AppState;
use crate::utils::parse_object_id;

fn validate_movie_fields(title: Option<&str>, duration: Option<i32>) -> Result<(), AppError> {
    if title.is_some_and(|t| t.trim().is_empty()) {
        return Err(AppError::BadRequest("Title must not be empty".to_string()));
    }
    if duration.is_some_and(|d| d <= 0) {
        return Err(AppError::BadRequest("Duration must be positive".to_string()));
    }
    Ok(())
}

pub async fn load_movies(Extension(state): Extension<Arc<AppState>>) -> Result<Json<Vec<MovieResponse>>, AppError> {
    let movies = state.movies.list_movies().await?;
    Ok(Json(movies.into_iter().map(MovieResponse::from).collect()))
}

pub async fn load_movie_with_details(
    Path(id_str): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<MovieDetail>, AppError> {
    let movie_id = parse_object_id(&id_str)?;

    let movie = state
        .movies
        .find_movie(movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;
    let shows = state.shows.list_shows_for_movie(movie_id).await?;

    Ok(Json(MovieDetail {
        movie: movie.into(),
        shows: shows.iter().map(ShowResponse::from).collect(),
    }))
}

pub async fn add_movie(
    AdminUser(admin): AdminUser,
    Extension(state): Extension<Arc<AppState>>,
    Json(new_movie): Json<NewMovie>,
) -> Result<(StatusCode, Json<MovieResponse>), AppError> {
    validate_movie_fields(Some(&new_movie.title), Some(new_movie.duration))?;

    let mut movie = Movie {
        id: None,
        title: new_movie.title.trim().to_string(),
        duration: new_movie.duration,
        description: new_movie.description,
        poster: new_movie.poster,
    };
    let id = state.movies.insert_movie(&movie).await?;
    movie.id = Some(id);

    tracing::info!(movie_id = %id, admin = %admin.user_id, "Movie added");
    Ok((StatusCode::CREATED, Json(movie.into())))
}

pub async fn update_movie(
    _admin: AdminUser,
    Extension(state): Extension<Arc<AppState>>,
    Path(id_str): Path<String>,
    Json(update_data): Json<MovieUpdate>,
) -> Result<Json<MovieUpdate>, AppError> {
    let movie_id = parse_object_id(&id_str)?;
    validate_movie_fields(update_data.title.as_deref(), update_data.duration)?;

    if state.movies.update_movie(movie_id, &update_data).await? {
        Ok(Json(update_data))
    } else {
        Err(AppError::NotFound("Movie not found".to_string()))
    }
}

pub async fn delete_movie(
    _admin: AdminUser,
    Path(id_str): Path<String>,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let movie_id = parse_object_id(&id_str)?;

    if !state.shows.list_shows_for_movie(movie_id).await?.is_empty() {
        return Err(AppError::BadRequest("Movie still has scheduled shows".to_string()));
    }

    if state.movies.delete_movie(movie_id).await? {
        Ok(Json(json!({ "success": true, "message": "Movie deleted successfully" })))
    } else {
        Err(AppError::NotFound("Movie not found".to_string()))
    }
}
