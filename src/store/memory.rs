//! In-process stores with the same conditional-update semantics as the Mongo ones.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::models::{
    booking_model::Booking,
    job_model::Job,
    movie_model::{Movie, MovieUpdate},
    show_model::{SeatReservation, Show},
    user_model::User,
};

use super::{BookingStore, JobStore, MovieStore, ShowStore, StoreResult, UserStore};

#[derive(Default)]
pub struct MemoryStore {
    movies: Mutex<HashMap<ObjectId, Movie>>,
    shows: Mutex<HashMap<ObjectId, Show>>,
    bookings: Mutex<HashMap<ObjectId, Booking>>,
    users: Mutex<HashMap<String, User>>,
    jobs: Mutex<HashMap<ObjectId, Job>>,
}

impl MemoryStore {
    pub fn show(&self, id: ObjectId) -> Option<Show> {
        self.shows.lock().unwrap().get(&id).cloned()
    }

    pub fn booking(&self, id: ObjectId) -> Option<Booking> {
        self.bookings.lock().unwrap().get(&id).cloned()
    }

    pub fn jobs(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.jobs.lock().unwrap().values().cloned().collect();
        jobs.sort_by_key(|job| job.run_at);
        jobs
    }

    /// Moves every pending job's due time into the past.
    pub fn make_jobs_due(&self) {
        let past = DateTime::from_millis(0);
        for job in self.jobs.lock().unwrap().values_mut() {
            job.run_at = past;
        }
    }
}

fn newest_first(mut bookings: Vec<Booking>) -> Vec<Booking> {
    bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    bookings
}

#[async_trait]
impl MovieStore for MemoryStore {
    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        Ok(self.movies.lock().unwrap().values().cloned().collect())
    }

    async fn find_movie(&self, id: ObjectId) -> StoreResult<Option<Movie>> {
        Ok(self.movies.lock().unwrap().get(&id).cloned())
    }

    async fn find_movies(&self, ids: &[ObjectId]) -> StoreResult<Vec<Movie>> {
        let movies = self.movies.lock().unwrap();
        Ok(ids.iter().filter_map(|id| movies.get(id).cloned()).collect())
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<ObjectId> {
        let id = movie.id.unwrap_or_else(ObjectId::new);
        let mut movie = movie.clone();
        movie.id = Some(id);
        self.movies.lock().unwrap().insert(id, movie);
        Ok(id)
    }

    async fn update_movie(&self, id: ObjectId, update: &MovieUpdate) -> StoreResult<bool> {
        let mut movies = self.movies.lock().unwrap();
        let Some(movie) = movies.get_mut(&id) else {
            return Ok(false);
        };
        if let Some(title) = &update.title {
            movie.title = title.clone();
        }
        if let Some(duration) = update.duration {
            movie.duration = duration;
        }
        if update.description.is_some() {
            movie.description = update.description.clone();
        }
        if update.poster.is_some() {
            movie.poster = update.poster.clone();
        }
        Ok(true)
    }

    async fn delete_movie(&self, id: ObjectId) -> StoreResult<bool> {
        Ok(self.movies.lock().unwrap().remove(&id).is_some())
    }
}

#[async_trait]
impl ShowStore for MemoryStore {
    async fn list_shows(&self) -> StoreResult<Vec<Show>> {
        let mut shows: Vec<Show> = self.shows.lock().unwrap().values().cloned().collect();
        shows.sort_by_key(|show| show.show_date_time);
        Ok(shows)
    }

    async fn list_shows_for_movie(&self, movie_id: ObjectId) -> StoreResult<Vec<Show>> {
        let shows = self.list_shows().await?;
        Ok(shows.into_iter().filter(|show| show.movie_id == movie_id).collect())
    }

    async fn find_show(&self, id: ObjectId) -> StoreResult<Option<Show>> {
        Ok(self.show(id))
    }

    async fn insert_show(&self, show: &Show) -> StoreResult<ObjectId> {
        let id = show.id.unwrap_or_else(ObjectId::new);
        let mut show = show.clone();
        show.id = Some(id);
        self.shows.lock().unwrap().insert(id, show);
        Ok(id)
    }

    async fn reserve_seats(
        &self,
        show_id: ObjectId,
        seats: &[String],
        user: &str,
    ) -> StoreResult<SeatReservation> {
        let mut shows = self.shows.lock().unwrap();
        let Some(show) = shows.get_mut(&show_id) else {
            return Ok(SeatReservation::ShowNotFound);
        };
        let taken = show.taken_seats(seats);
        if !taken.is_empty() {
            return Ok(SeatReservation::Taken(taken));
        }
        for seat in seats {
            show.occupied_seats.insert(seat.clone(), user.to_string());
        }
        Ok(SeatReservation::Reserved)
    }

    async fn release_seats(&self, show_id: ObjectId, seats: &[String], user: &str) -> StoreResult<()> {
        if let Some(show) = self.shows.lock().unwrap().get_mut(&show_id) {
            show.occupied_seats
                .retain(|seat, owner| !(seats.contains(seat) && owner == user));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<ObjectId> {
        let id = booking.id.unwrap_or_else(ObjectId::new);
        let mut booking = booking.clone();
        booking.id = Some(id);
        self.bookings.lock().unwrap().insert(id, booking);
        Ok(id)
    }

    async fn find_booking(&self, id: ObjectId) -> StoreResult<Option<Booking>> {
        Ok(self.booking(id))
    }

    async fn set_payment_link(&self, id: ObjectId, link: &str) -> StoreResult<()> {
        if let Some(booking) = self.bookings.lock().unwrap().get_mut(&id) {
            booking.payment_link = link.to_string();
        }
        Ok(())
    }

    async fn mark_paid(&self, id: ObjectId, payment_intent: Option<&str>) -> StoreResult<bool> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(&id) {
            Some(booking) if !booking.is_paid && !booking.expired => {
                booking.is_paid = true;
                booking.payment_link.clear();
                if let Some(intent) = payment_intent {
                    booking.payment_intent = Some(intent.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_expired(&self, id: ObjectId) -> StoreResult<Option<Booking>> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(&id) {
            Some(booking) if !booking.is_paid => {
                booking.expired = true;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn mark_seats_released(&self, id: ObjectId) -> StoreResult<()> {
        if let Some(booking) = self.bookings.lock().unwrap().get_mut(&id) {
            booking.seats_released = true;
        }
        Ok(())
    }

    async fn claim_confirmation(&self, id: ObjectId) -> StoreResult<bool> {
        let mut bookings = self.bookings.lock().unwrap();
        match bookings.get_mut(&id) {
            Some(booking) if booking.is_paid && !booking.confirmation_sent => {
                booking.confirmation_sent = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn drop_confirmation_claim(&self, id: ObjectId) -> StoreResult<()> {
        if let Some(booking) = self.bookings.lock().unwrap().get_mut(&id) {
            booking.confirmation_sent = false;
        }
        Ok(())
    }

    async fn delete_booking(&self, id: ObjectId) -> StoreResult<bool> {
        Ok(self.bookings.lock().unwrap().remove(&id).is_some())
    }

    async fn list_bookings_for_user(&self, user: &str) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.lock().unwrap();
        Ok(newest_first(
            bookings.values().filter(|b| b.user == user).cloned().collect(),
        ))
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        Ok(newest_first(self.bookings.lock().unwrap().values().cloned().collect()))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user_if_absent(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.id) {
            return Ok(false);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(true)
    }

    async fn update_user_profile(&self, user: &User) -> StoreResult<bool> {
        let mut users = self.users.lock().unwrap();
        let Some(existing) = users.get_mut(&user.id) else {
            return Ok(false);
        };
        existing.email = user.email.clone();
        existing.name = user.name.clone();
        existing.image = user.image.clone();
        Ok(true)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        Ok(self.users.lock().unwrap().remove(id).is_some())
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(id).cloned())
    }

    async fn add_favourite(&self, id: &str, movie_id: ObjectId) -> StoreResult<bool> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(id) else {
            return Ok(false);
        };
        if !user.favourites.contains(&movie_id) {
            user.favourites.push(movie_id);
        }
        Ok(true)
    }

    async fn remove_favourite(&self, id: &str, movie_id: ObjectId) -> StoreResult<bool> {
        let mut users = self.users.lock().unwrap();
        let Some(user) = users.get_mut(id) else {
            return Ok(false);
        };
        user.favourites.retain(|favourite| *favourite != movie_id);
        Ok(true)
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn enqueue(&self, job: &Job) -> StoreResult<ObjectId> {
        let id = ObjectId::new();
        let mut job = job.clone();
        job.id = Some(id);
        self.jobs.lock().unwrap().insert(id, job);
        Ok(id)
    }

    async fn claim_due(&self, now: DateTime, lease_until: DateTime) -> StoreResult<Option<Job>> {
        let mut jobs = self.jobs.lock().unwrap();
        let due = jobs
            .values_mut()
            .filter(|job| {
                !job.dead
                    && job.run_at <= now
                    && job.locked_until.map_or(true, |until| until <= now)
            })
            .min_by_key(|job| job.run_at);
        Ok(due.map(|job| {
            job.locked_until = Some(lease_until);
            job.attempts += 1;
            job.clone()
        }))
    }

    async fn complete(&self, id: ObjectId) -> StoreResult<()> {
        self.jobs.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn fail(&self, id: ObjectId, error: &str, retry_at: Option<DateTime>) -> StoreResult<()> {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(&id) {
            job.locked_until = None;
            job.last_error = Some(error.to_string());
            match retry_at {
                Some(run_at) => job.run_at = run_at,
                None => job.dead = true,
            }
        }
        Ok(())
    }
}
