use std::sync::Arc;

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::reservation::ReservationService;
use crate::store::{BookingStore, MovieStore, ShowStore, UserStore};

/// Shared by every handler through an `Extension<Arc<AppState>>` layer.
pub struct AppState {
    pub config: Config,
    pub movies: Arc<dyn MovieStore>,
    pub shows: Arc<dyn ShowStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub users: Arc<dyn UserStore>,
    pub reservations: Arc<ReservationService>,
    pub tokens: TokenVerifier,
}
