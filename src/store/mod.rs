use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::models::{
    booking_model::Booking,
    job_model::Job,
    movie_model::{Movie, MovieUpdate},
    show_model::{SeatReservation, Show},
    user_model::User,
};

pub mod mongo;

#[cfg(test)]
pub mod memory;

pub use mongo::MongoStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("malformed document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("unencodable document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),

    #[error("unexpected insert id: {0}")]
    InsertId(String),

    #[error("seat map of show {0} kept changing during reservation")]
    Contention(ObjectId),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn list_movies(&self) -> StoreResult<Vec<Movie>>;

    async fn find_movie(&self, id: ObjectId) -> StoreResult<Option<Movie>>;

    async fn find_movies(&self, ids: &[ObjectId]) -> StoreResult<Vec<Movie>>;

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<ObjectId>;

    /// Applies the provided fields only. Returns false when the movie does not exist.
    async fn update_movie(&self, id: ObjectId, update: &MovieUpdate) -> StoreResult<bool>;

    async fn delete_movie(&self, id: ObjectId) -> StoreResult<bool>;
}

#[async_trait]
pub trait ShowStore: Send + Sync {
    async fn list_shows(&self) -> StoreResult<Vec<Show>>;

    async fn list_shows_for_movie(&self, movie_id: ObjectId) -> StoreResult<Vec<Show>>;

    async fn find_show(&self, id: ObjectId) -> StoreResult<Option<Show>>;

    async fn insert_show(&self, show: &Show) -> StoreResult<ObjectId>;

    /// Marks every seat as held by `user` in one atomic step, or none of them if any
    /// seat is already held.
    async fn reserve_seats(
        &self,
        show_id: ObjectId,
        seats: &[String],
        user: &str,
    ) -> StoreResult<SeatReservation>;

    /// Frees the given seats, skipping any that are no longer held by `user`.
    async fn release_seats(&self, show_id: ObjectId, seats: &[String], user: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<ObjectId>;

    async fn find_booking(&self, id: ObjectId) -> StoreResult<Option<Booking>>;

    async fn set_payment_link(&self, id: ObjectId, link: &str) -> StoreResult<()>;

    /// Flips an unpaid, unexpired booking to paid and clears its payment link.
    /// Returns true only for the call that performed the transition.
    async fn mark_paid(&self, id: ObjectId, payment_intent: Option<&str>) -> StoreResult<bool>;

    /// Claims an unpaid booking for release. Returns the booking when it is unpaid,
    /// including when an earlier release attempt already claimed it.
    async fn mark_expired(&self, id: ObjectId) -> StoreResult<Option<Booking>>;

    /// Records that the seats of a claimed booking have been freed.
    async fn mark_seats_released(&self, id: ObjectId) -> StoreResult<()>;

    /// Takes the right to send the confirmation email of a paid booking. Returns true
    /// for exactly one caller until the claim is dropped again.
    async fn claim_confirmation(&self, id: ObjectId) -> StoreResult<bool>;

    async fn drop_confirmation_claim(&self, id: ObjectId) -> StoreResult<()>;

    async fn delete_booking(&self, id: ObjectId) -> StoreResult<bool>;

    async fn list_bookings_for_user(&self, user: &str) -> StoreResult<Vec<Booking>>;

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns false when a user with the same id already exists.
    async fn create_user_if_absent(&self, user: &User) -> StoreResult<bool>;

    async fn update_user_profile(&self, user: &User) -> StoreResult<bool>;

    async fn delete_user(&self, id: &str) -> StoreResult<bool>;

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    /// Adds the movie unless already present. Returns false when the user does not exist.
    async fn add_favourite(&self, id: &str, movie_id: ObjectId) -> StoreResult<bool>;

    async fn remove_favourite(&self, id: &str, movie_id: ObjectId) -> StoreResult<bool>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn enqueue(&self, job: &Job) -> StoreResult<ObjectId>;

    /// Leases the oldest due job until `lease_until` and bumps its attempt counter.
    async fn claim_due(&self, now: DateTime, lease_until: DateTime) -> StoreResult<Option<Job>>;

    async fn complete(&self, id: ObjectId) -> StoreResult<()>;

    /// Records a failed run. `retry_at` of `None` parks the job for good.
    async fn fail(&self, id: ObjectId, error: &str, retry_at: Option<DateTime>) -> StoreResult<()>;
}
