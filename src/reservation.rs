//! Seat reservation and payment lifecycle.
//!
//! A booking holds its seats from creation until either the payment webhook marks it
//! paid or the release job fires after the hold period and frees them again.

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::oid::ObjectId;
use tracing::{error, info, warn};

use crate::jobs::JobScheduler;
use crate::models::{booking_model::Booking, job_model::JobPayload, show_model::SeatReservation};
use crate::payments::{CheckoutRequest, PaymentError, PaymentGateway};
use crate::store::{BookingStore, MovieStore, ShowStore, StoreError};
use crate::utils::validate_seats;

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("show not found")]
    ShowNotFound,

    #[error("seats not available: {0:?}")]
    SeatUnavailable(Vec<String>),

    #[error("{0}")]
    InvalidSeats(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Payment(#[from] PaymentError),
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub show_id: ObjectId,
    pub seats: Vec<String>,
    pub user_id: String,
    /// Base URL the checkout page redirects back to.
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedBooking {
    pub booking_id: ObjectId,
    pub amount: f64,
    pub payment_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfirmOutcome {
    Confirmed,
    AlreadyPaid,
    /// The release job claimed the booking before the payment arrived.
    Expired,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReleaseOutcome {
    Released(Vec<String>),
    AlreadyPaid,
    NotFound,
}

pub struct ReservationService {
    shows: Arc<dyn ShowStore>,
    bookings: Arc<dyn BookingStore>,
    movies: Arc<dyn MovieStore>,
    gateway: Arc<dyn PaymentGateway>,
    scheduler: JobScheduler,
    hold: Duration,
    currency: String,
}

impl ReservationService {
    pub fn new(
        shows: Arc<dyn ShowStore>,
        bookings: Arc<dyn BookingStore>,
        movies: Arc<dyn MovieStore>,
        gateway: Arc<dyn PaymentGateway>,
        scheduler: JobScheduler,
        hold: Duration,
        currency: String,
    ) -> Self {
        ReservationService {
            shows,
            bookings,
            movies,
            gateway,
            scheduler,
            hold,
            currency,
        }
    }

    /// Holds the requested seats, records an unpaid booking and opens a checkout
    /// session for it.
    pub async fn create(&self, request: NewBooking) -> Result<CreatedBooking, ReservationError> {
        validate_seats(&request.seats).map_err(ReservationError::InvalidSeats)?;

        let show = self
            .shows
            .find_show(request.show_id)
            .await?
            .ok_or(ReservationError::ShowNotFound)?;

        match self
            .shows
            .reserve_seats(request.show_id, &request.seats, &request.user_id)
            .await?
        {
            SeatReservation::Reserved => {}
            SeatReservation::Taken(seats) => return Err(ReservationError::SeatUnavailable(seats)),
            SeatReservation::ShowNotFound => return Err(ReservationError::ShowNotFound),
        }

        let amount = show.show_price * request.seats.len() as f64;
        let booking = Booking::new(&request.user_id, request.show_id, amount, request.seats.clone());

        let booking_id = match self.bookings.insert_booking(&booking).await {
            Ok(id) => id,
            Err(e) => {
                self.free_seats(&booking).await;
                return Err(e.into());
            }
        };

        // Scheduled before talking to the gateway: from here on the release job owns
        // cleanup of this booking, whatever fails next.
        if let Err(e) = self
            .scheduler
            .schedule_after(self.hold, JobPayload::ReleaseSeats { booking_id })
            .await
        {
            self.free_seats(&booking).await;
            if let Err(delete_err) = self.bookings.delete_booking(booking_id).await {
                error!(booking_id = %booking_id, error = %delete_err, "Failed to delete unscheduled booking");
            }
            return Err(e.into());
        }

        let product_name = match self.movies.find_movie(show.movie_id).await {
            Ok(Some(movie)) => movie.title,
            Ok(None) => "Movie ticket".to_string(),
            Err(e) => {
                warn!(movie_id = %show.movie_id, error = %e, "Movie lookup failed, using generic product name");
                "Movie ticket".to_string()
            }
        };

        let checkout = CheckoutRequest {
            booking_id: booking_id.to_hex(),
            amount_cents: (amount * 100.0).round() as i64,
            currency: self.currency.clone(),
            product_name,
            description: format!("Seats: {}", request.seats.join(", ")),
            success_url: format!("{}/loading/my-bookings", request.origin),
            cancel_url: format!("{}/my-bookings", request.origin),
        };

        let payment_url = match self.gateway.create_checkout_session(&checkout).await {
            Ok(url) => url,
            Err(e) => {
                warn!(booking_id = %booking_id, error = %e, "Checkout session failed, seats stay held until release");
                return Err(e.into());
            }
        };

        self.bookings.set_payment_link(booking_id, &payment_url).await?;

        info!(
            booking_id = %booking_id,
            show_id = %request.show_id,
            user = %request.user_id,
            seats = ?request.seats,
            amount,
            "Booking created"
        );

        Ok(CreatedBooking {
            booking_id,
            amount,
            payment_url,
        })
    }

    /// Marks a booking paid. Safe to call any number of times for the same booking.
    pub async fn confirm_payment(
        &self,
        booking_id: ObjectId,
        payment_intent: Option<&str>,
    ) -> Result<ConfirmOutcome, StoreError> {
        if self.bookings.mark_paid(booking_id, payment_intent).await? {
            info!(booking_id = %booking_id, "Booking marked as paid");

            if let Err(e) = self
                .scheduler
                .schedule_now(JobPayload::SendConfirmation { booking_id })
                .await
            {
                warn!(booking_id = %booking_id, error = %e, "Confirmation email not queued");
            }
            return Ok(ConfirmOutcome::Confirmed);
        }

        let outcome = match self.bookings.find_booking(booking_id).await? {
            None => {
                warn!(booking_id = %booking_id, "Payment received for unknown booking");
                ConfirmOutcome::NotFound
            }
            Some(booking) if booking.is_paid => {
                info!(booking_id = %booking_id, "Booking already marked paid");
                ConfirmOutcome::AlreadyPaid
            }
            Some(_) => {
                error!(booking_id = %booking_id, "Payment received after the booking hold expired");
                ConfirmOutcome::Expired
            }
        };
        Ok(outcome)
    }

    /// Frees the seats of a booking that is still unpaid and deletes it. Paid or
    /// already removed bookings are left alone.
    pub async fn release_if_unpaid(&self, booking_id: ObjectId) -> Result<ReleaseOutcome, StoreError> {
        let Some(booking) = self.bookings.mark_expired(booking_id).await? else {
            let outcome = match self.bookings.find_booking(booking_id).await? {
                Some(_) => ReleaseOutcome::AlreadyPaid,
                None => ReleaseOutcome::NotFound,
            };
            info!(booking_id = %booking_id, ?outcome, "Nothing to release");
            return Ok(outcome);
        };

        if !booking.seats_released {
            // An earlier attempt may have freed these seats already, and the same user
            // may have taken some of them again under a newer booking.
            let held_elsewhere: Vec<String> = self
                .bookings
                .list_bookings_for_user(&booking.user)
                .await?
                .into_iter()
                .filter(|other| other.id != booking.id && other.show == booking.show && !other.expired)
                .flat_map(|other| other.booked_seats)
                .collect();
            let seats: Vec<String> = booking
                .booked_seats
                .iter()
                .filter(|seat| !held_elsewhere.contains(*seat))
                .cloned()
                .collect();

            self.shows.release_seats(booking.show, &seats, &booking.user).await?;
            self.bookings.mark_seats_released(booking_id).await?;
        }
        self.bookings.delete_booking(booking_id).await?;

        info!(
            booking_id = %booking_id,
            show_id = %booking.show,
            seats = ?booking.booked_seats,
            "Released seats of unpaid booking"
        );
        Ok(ReleaseOutcome::Released(booking.booked_seats))
    }

    pub async fn occupied_seats(&self, show_id: ObjectId) -> Result<Vec<String>, ReservationError> {
        let show = self
            .shows
            .find_show(show_id)
            .await?
            .ok_or(ReservationError::ShowNotFound)?;
        Ok(show.occupied_seats.into_keys().collect())
    }

    async fn free_seats(&self, booking: &Booking) {
        if let Err(e) = self
            .shows
            .release_seats(booking.show, &booking.booked_seats, &booking.user)
            .await
        {
            error!(show_id = %booking.show, error = %e, "Failed to free seats of abandoned booking");
        }
    }
}
