use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_document, Bson, DateTime, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument, UpdateOptions},
    results::InsertOneResult,
    Collection, Database, IndexModel,
};

use crate::models::{
    booking_model::Booking,
    job_model::Job,
    movie_model::{Movie, MovieUpdate},
    show_model::{SeatReservation, Show},
    user_model::User,
};

use super::{BookingStore, JobStore, MovieStore, ShowStore, StoreError, StoreResult, UserStore};

/// Attempts made when a reservation loses a race against a release of the same seats.
const RESERVE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        MongoStore { db }
    }

    fn movies(&self) -> Collection<Movie> {
        self.db.collection("movies")
    }

    fn shows(&self) -> Collection<Show> {
        self.db.collection("shows")
    }

    fn bookings(&self) -> Collection<Booking> {
        self.db.collection("bookings")
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn jobs(&self) -> Collection<Job> {
        self.db.collection("jobs")
    }

    pub async fn ensure_indexes(&self) -> StoreResult<()> {
        self.jobs()
            .create_index(IndexModel::builder().keys(doc! { "dead": 1, "run_at": 1 }).build(), None)
            .await?;
        self.bookings()
            .create_index(IndexModel::builder().keys(doc! { "user": 1, "created_at": -1 }).build(), None)
            .await?;
        self.shows()
            .create_index(IndexModel::builder().keys(doc! { "movie_id": 1 }).build(), None)
            .await?;
        Ok(())
    }
}

fn inserted_object_id(result: InsertOneResult) -> StoreResult<ObjectId> {
    result
        .inserted_id
        .as_object_id()
        .ok_or_else(|| StoreError::InsertId(result.inserted_id.to_string()))
}

fn newest_first() -> FindOptions {
    FindOptions::builder().sort(doc! { "created_at": -1 }).build()
}

#[async_trait]
impl MovieStore for MongoStore {
    async fn list_movies(&self) -> StoreResult<Vec<Movie>> {
        let cursor = self.movies().find(None, None).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_movie(&self, id: ObjectId) -> StoreResult<Option<Movie>> {
        Ok(self.movies().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_movies(&self, ids: &[ObjectId]) -> StoreResult<Vec<Movie>> {
        let cursor = self
            .movies()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn insert_movie(&self, movie: &Movie) -> StoreResult<ObjectId> {
        let result = self.movies().insert_one(movie, None).await?;
        inserted_object_id(result)
    }

    async fn update_movie(&self, id: ObjectId, update: &MovieUpdate) -> StoreResult<bool> {
        let set: Document = to_document(update)?
            .into_iter()
            .filter(|(_, value)| !matches!(value, Bson::Null))
            .collect();

        if set.is_empty() {
            let count = self.movies().count_documents(doc! { "_id": id }, None).await?;
            return Ok(count == 1);
        }

        let result = self
            .movies()
            .update_one(doc! { "_id": id }, doc! { "$set": set }, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_movie(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.movies().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }
}

#[async_trait]
impl ShowStore for MongoStore {
    async fn list_shows(&self) -> StoreResult<Vec<Show>> {
        let options = FindOptions::builder().sort(doc! { "show_date_time": 1 }).build();
        let cursor = self.shows().find(None, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_shows_for_movie(&self, movie_id: ObjectId) -> StoreResult<Vec<Show>> {
        let options = FindOptions::builder().sort(doc! { "show_date_time": 1 }).build();
        let cursor = self.shows().find(doc! { "movie_id": movie_id }, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_show(&self, id: ObjectId) -> StoreResult<Option<Show>> {
        Ok(self.shows().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert_show(&self, show: &Show) -> StoreResult<ObjectId> {
        let result = self.shows().insert_one(show, None).await?;
        inserted_object_id(result)
    }

    async fn reserve_seats(
        &self,
        show_id: ObjectId,
        seats: &[String],
        user: &str,
    ) -> StoreResult<SeatReservation> {
        // The filter only matches while every requested seat key is absent, so the
        // check and the write happen in a single document update.
        let mut filter = doc! { "_id": show_id };
        let mut set = Document::new();
        for seat in seats {
            let path = format!("occupied_seats.{seat}");
            filter.insert(path.clone(), doc! { "$exists": false });
            set.insert(path, user);
        }

        for _ in 0..RESERVE_ATTEMPTS {
            let result = self
                .shows()
                .update_one(filter.clone(), doc! { "$set": set.clone() }, None)
                .await?;
            if result.matched_count == 1 {
                return Ok(SeatReservation::Reserved);
            }

            let Some(show) = self.find_show(show_id).await? else {
                return Ok(SeatReservation::ShowNotFound);
            };
            let taken = show.taken_seats(seats);
            if !taken.is_empty() {
                return Ok(SeatReservation::Taken(taken));
            }
            // Seats were freed between the update and the read; try again.
        }

        Err(StoreError::Contention(show_id))
    }

    async fn release_seats(&self, show_id: ObjectId, seats: &[String], user: &str) -> StoreResult<()> {
        // Rebuilds the seat map without the entries that are both requested and still
        // owned by `user`, as one pipeline update.
        let pipeline = vec![doc! {
            "$set": {
                "occupied_seats": {
                    "$arrayToObject": {
                        "$filter": {
                            "input": { "$objectToArray": { "$ifNull": ["$occupied_seats", Document::new()] } },
                            "cond": {
                                "$not": [{
                                    "$and": [
                                        { "$in": ["$$this.k", seats.to_vec()] },
                                        { "$eq": ["$$this.v", user] },
                                    ]
                                }]
                            }
                        }
                    }
                }
            }
        }];

        self.shows().update_one(doc! { "_id": show_id }, pipeline, None).await?;
        Ok(())
    }
}

#[async_trait]
impl BookingStore for MongoStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<ObjectId> {
        let result = self.bookings().insert_one(booking, None).await?;
        inserted_object_id(result)
    }

    async fn find_booking(&self, id: ObjectId) -> StoreResult<Option<Booking>> {
        Ok(self.bookings().find_one(doc! { "_id": id }, None).await?)
    }

    async fn set_payment_link(&self, id: ObjectId, link: &str) -> StoreResult<()> {
        self.bookings()
            .update_one(doc! { "_id": id }, doc! { "$set": { "payment_link": link } }, None)
            .await?;
        Ok(())
    }

    async fn mark_paid(&self, id: ObjectId, payment_intent: Option<&str>) -> StoreResult<bool> {
        let mut set = doc! { "is_paid": true, "payment_link": "" };
        if let Some(intent) = payment_intent {
            set.insert("payment_intent", intent);
        }

        let result = self
            .bookings()
            .update_one(
                doc! { "_id": id, "is_paid": false, "expired": { "$ne": true } },
                doc! { "$set": set },
                None,
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn mark_expired(&self, id: ObjectId) -> StoreResult<Option<Booking>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .bookings()
            .find_one_and_update(
                doc! { "_id": id, "is_paid": false },
                doc! { "$set": { "expired": true } },
                options,
            )
            .await?)
    }

    async fn mark_seats_released(&self, id: ObjectId) -> StoreResult<()> {
        self.bookings()
            .update_one(doc! { "_id": id }, doc! { "$set": { "seats_released": true } }, None)
            .await?;
        Ok(())
    }

    async fn claim_confirmation(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self
            .bookings()
            .update_one(
                doc! { "_id": id, "is_paid": true, "confirmation_sent": { "$ne": true } },
                doc! { "$set": { "confirmation_sent": true } },
                None,
            )
            .await?;
        Ok(result.modified_count == 1)
    }

    async fn drop_confirmation_claim(&self, id: ObjectId) -> StoreResult<()> {
        self.bookings()
            .update_one(doc! { "_id": id }, doc! { "$set": { "confirmation_sent": false } }, None)
            .await?;
        Ok(())
    }

    async fn delete_booking(&self, id: ObjectId) -> StoreResult<bool> {
        let result = self.bookings().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn list_bookings_for_user(&self, user: &str) -> StoreResult<Vec<Booking>> {
        let cursor = self.bookings().find(doc! { "user": user }, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_bookings(&self) -> StoreResult<Vec<Booking>> {
        let cursor = self.bookings().find(None, newest_first()).await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn create_user_if_absent(&self, user: &User) -> StoreResult<bool> {
        let options = UpdateOptions::builder().upsert(true).build();
        let result = self
            .users()
            .update_one(
                doc! { "_id": user.id.as_str() },
                doc! { "$setOnInsert": to_document(user)? },
                options,
            )
            .await?;
        Ok(result.upserted_id.is_some())
    }

    async fn update_user_profile(&self, user: &User) -> StoreResult<bool> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": user.id.as_str() },
                doc! { "$set": { "email": user.email.as_str(), "name": user.name.as_str(), "image": user.image.clone() } },
                None,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let result = self.users().delete_one(doc! { "_id": id }, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn add_favourite(&self, id: &str, movie_id: ObjectId) -> StoreResult<bool> {
        let result = self
            .users()
            .update_one(doc! { "_id": id }, doc! { "$addToSet": { "favourites": movie_id } }, None)
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn remove_favourite(&self, id: &str, movie_id: ObjectId) -> StoreResult<bool> {
        let result = self
            .users()
            .update_one(doc! { "_id": id }, doc! { "$pull": { "favourites": movie_id } }, None)
            .await?;
        Ok(result.matched_count == 1)
    }
}

#[async_trait]
impl JobStore for MongoStore {
    async fn enqueue(&self, job: &Job) -> StoreResult<ObjectId> {
        let result = self.jobs().insert_one(job, None).await?;
        inserted_object_id(result)
    }

    async fn claim_due(&self, now: DateTime, lease_until: DateTime) -> StoreResult<Option<Job>> {
        let options = FindOneAndUpdateOptions::builder()
            .sort(doc! { "run_at": 1 })
            .return_document(ReturnDocument::After)
            .build();
        Ok(self
            .jobs()
            .find_one_and_update(
                doc! {
                    "dead": false,
                    "run_at": { "$lte": now },
                    "$or": [
                        { "locked_until": null },
                        { "locked_until": { "$lte": now } },
                    ],
                },
                doc! {
                    "$set": { "locked_until": lease_until },
                    "$inc": { "attempts": 1 },
                },
                options,
            )
            .await?)
    }

    async fn complete(&self, id: ObjectId) -> StoreResult<()> {
        self.jobs().delete_one(doc! { "_id": id }, None).await?;
        Ok(())
    }

    async fn fail(&self, id: ObjectId, error: &str, retry_at: Option<DateTime>) -> StoreResult<()> {
        let set = match retry_at {
            Some(run_at) => doc! { "run_at": run_at, "locked_until": Bson::Null, "last_error": error },
            None => doc! { "dead": true, "locked_until": Bson::Null, "last_error": error },
        };
        self.jobs().update_one(doc! { "_id": id }, doc! { "$set": set }, None).await?;
        Ok(())
    }
}
