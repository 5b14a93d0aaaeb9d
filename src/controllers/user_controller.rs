use axum::{extract::Extension, response::Json};
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::controllers::show_controller::with_movies;
use crate::error::AppError;
use crate::models::{
    booking_model::{Booking, BookingResponse},
    movie_model::MovieResponse,
    show_model::ShowDetail,
    user_model::FavouriteRequest,
};
use crate::state::AppState;
use crate::utils::parse_object_id;

#[derive(Debug, Serialize)]
pub struct BookingWithShow {
    #[serde(flatten)]
    pub booking: BookingResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub show: Option<ShowDetail>,
}

/// Pairs bookings with their show and movie, newest booking first.
pub async fn with_shows(state: &AppState, bookings: Vec<Booking>) -> Result<Vec<BookingWithShow>, AppError> {
    let mut show_ids: Vec<ObjectId> = bookings.iter().map(|b| b.show).collect();
    show_ids.sort();
    show_ids.dedup();

    let mut shows = Vec::with_capacity(show_ids.len());
    for id in show_ids {
        if let Some(show) = state.shows.find_show(id).await? {
            shows.push(show);
        }
    }
    let details: HashMap<ObjectId, ShowDetail> = with_movies(state, &shows)
        .await?
        .into_iter()
        .filter_map(|detail| detail.show.id.map(|id| (id, detail)))
        .collect();

    Ok(bookings
        .into_iter()
        .map(|booking| BookingWithShow {
            show: details.get(&booking.show).cloned(),
            booking: booking.into(),
        })
        .collect())
}

pub async fn get_user_bookings(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.bookings.list_bookings_for_user(&user.user_id).await?;
    let bookings = with_shows(&state, bookings).await?;
    Ok(Json(json!({ "success": true, "bookings": bookings })))
}

/// Adds the movie to the caller's favourites, or removes it if already there.
pub async fn update_favourite(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
    Json(request): Json<FavouriteRequest>,
) -> Result<Json<Value>, AppError> {
    let movie_id = parse_object_id(&request.movie_id)?;
    let profile = state
        .users
        .find_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // Single-element $addToSet / $pull, so concurrent toggles of other movies are kept.
    let removed = profile.favourites.contains(&movie_id);
    let updated = if removed {
        state.users.remove_favourite(&user.user_id, movie_id).await?
    } else {
        if state.movies.find_movie(movie_id).await?.is_none() {
            return Err(AppError::NotFound("Movie not found".to_string()));
        }
        state.users.add_favourite(&user.user_id, movie_id).await?
    };
    if !updated {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let message = if removed { "Removed from favourites" } else { "Added to favourites" };
    Ok(Json(json!({ "success": true, "message": message })))
}

pub async fn get_favourites(
    user: AuthUser,
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let profile = state
        .users
        .find_user(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let movies: Vec<MovieResponse> = state
        .movies
        .find_movies(&profile.favourites)
        .await?
        .into_iter()
        .map(MovieResponse::from)
        .collect();
    Ok(Json(json!({ "success": true, "movies": movies })))
}
