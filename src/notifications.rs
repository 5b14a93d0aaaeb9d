use std::sync::Arc;

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tracing::{info, warn};

use crate::store::{BookingStore, MovieStore, ShowStore, StoreError, UserStore};

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mail(#[from] MailError),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Writes outgoing mail to the log instead of handing it to a mail provider.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: &str) -> Self {
        LogMailer { from: from.to_string() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        info!(from = %self.from, to = %email.to, subject = %email.subject, body = %email.body, "Email sent");
        Ok(())
    }
}

pub struct BookingNotifier {
    bookings: Arc<dyn BookingStore>,
    shows: Arc<dyn ShowStore>,
    movies: Arc<dyn MovieStore>,
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    currency: String,
}

impl BookingNotifier {
    pub fn new(
        bookings: Arc<dyn BookingStore>,
        shows: Arc<dyn ShowStore>,
        movies: Arc<dyn MovieStore>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        currency: String,
    ) -> Self {
        BookingNotifier {
            bookings,
            shows,
            movies,
            users,
            mailer,
            currency,
        }
    }

    /// Emails the booking owner that their payment went through. Returns false when
    /// there was nothing to send.
    ///
    /// The booking is claimed before the mailer runs, so a job that is retried after a
    /// successful send (lost completion, expired lease) does not mail twice. A failed
    /// send drops the claim again for the next attempt.
    pub async fn send_confirmation(&self, booking_id: ObjectId) -> Result<bool, NotifyError> {
        let Some(booking) = self.bookings.find_booking(booking_id).await? else {
            warn!(booking_id = %booking_id, "Confirmation skipped, booking is gone");
            return Ok(false);
        };
        if !booking.is_paid {
            warn!(booking_id = %booking_id, "Confirmation skipped, booking is unpaid");
            return Ok(false);
        }
        let Some(user) = self.users.find_user(&booking.user).await? else {
            warn!(booking_id = %booking_id, user = %booking.user, "Confirmation skipped, user not synced");
            return Ok(false);
        };

        let show = self.shows.find_show(booking.show).await?;
        let title = match &show {
            Some(show) => self
                .movies
                .find_movie(show.movie_id)
                .await?
                .map(|movie| movie.title),
            None => None,
        }
        .unwrap_or_else(|| "your movie".to_string());
        let when = show
            .map(|show| show.show_date_time.to_chrono().format("%A, %B %-d %Y at %H:%M UTC").to_string())
            .unwrap_or_else(|| "the scheduled time".to_string());

        let greeting = if user.name.is_empty() { "Hi there".to_string() } else { format!("Hi {}", user.name) };
        let email = Email {
            to: user.email,
            subject: format!("Your booking for {title} is confirmed"),
            body: format!(
                "{greeting},\n\nYour booking for {title} on {when} is confirmed.\nSeats: {}\nAmount paid: {:.2} {}\nBooking reference: {}\n\nEnjoy the show!",
                booking.booked_seats.join(", "),
                booking.amount,
                self.currency.to_uppercase(),
                booking_id.to_hex(),
            ),
        };

        if !self.bookings.claim_confirmation(booking_id).await? {
            info!(booking_id = %booking_id, "Confirmation already sent");
            return Ok(false);
        }
        if let Err(e) = self.mailer.send(&email).await {
            if let Err(release_err) = self.bookings.drop_confirmation_claim(booking_id).await {
                warn!(booking_id = %booking_id, error = %release_err, "Failed to drop confirmation claim");
            }
            return Err(e.into());
        }
        info!(booking_id = %booking_id, to = %email.to, "Booking confirmation sent");
        Ok(true)
    }
}
