//! Wiring for tests: in-memory stores, a scripted gateway and a recording mailer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mongodb::bson::{oid::ObjectId, DateTime};

use crate::auth::{token_for_test, TokenVerifier};
use crate::config::Config;
use crate::jobs::{JobScheduler, JobWorker};
use crate::models::{movie_model::Movie, show_model::Show, user_model::User};
use crate::notifications::{BookingNotifier, Email, MailError, Mailer};
use crate::payments::{CheckoutRequest, PaymentError, PaymentGateway};
use crate::reservation::ReservationService;
use crate::state::AppState;
use crate::store::{memory::MemoryStore, MovieStore, ShowStore, UserStore};

pub const JWT_SECRET: &str = "test-session-secret";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_stripe_test";
// base64("clerk-signing-key")
pub const CLERK_WEBHOOK_SECRET: &str = "whsec_Y2xlcmstc2lnbmluZy1rZXk=";

#[derive(Default)]
pub struct FakeGateway {
    requests: Mutex<Vec<CheckoutRequest>>,
    fail_next: AtomicBool,
}

impl FakeGateway {
    pub fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout_session(&self, checkout: &CheckoutRequest) -> Result<String, PaymentError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::Rejected("card network unavailable".into()));
        }
        self.requests.lock().unwrap().push(checkout.clone());
        Ok(format!("https://checkout.test/{}", checkout.booking_id))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail_always(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn recover(&self) {
        self.fail.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Delivery("smtp relay refused".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub fn test_config() -> Config {
    let secrets: HashMap<&str, &str> = [
        ("MONGODB_URI", "mongodb://localhost:27017"),
        ("APP_URL", "http://localhost:5173"),
        ("STRIPE_SECRET_KEY", "sk_test_123"),
        ("STRIPE_WEBHOOK_SECRET", STRIPE_WEBHOOK_SECRET),
        ("CLERK_WEBHOOK_SECRET", CLERK_WEBHOOK_SECRET),
        ("CLERK_JWT_KEY", "unused-in-tests"),
    ]
    .into_iter()
    .collect();
    Config::from_lookup(|key| secrets.get(key).map(|v| v.to_string())).unwrap()
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<FakeGateway>,
    pub mailer: Arc<RecordingMailer>,
    pub state: Arc<AppState>,
    pub worker: JobWorker,
    notifier: Arc<BookingNotifier>,
    scheduler: JobScheduler,
}

impl Harness {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::default());
        let gateway = Arc::new(FakeGateway::default());
        let mailer = Arc::new(RecordingMailer::default());
        let scheduler = JobScheduler::new(store.clone());

        let reservations = Arc::new(ReservationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            gateway.clone(),
            scheduler.clone(),
            config.booking.hold,
            config.stripe.currency.clone(),
        ));
        let notifier = Arc::new(BookingNotifier::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            mailer.clone(),
            config.stripe.currency.clone(),
        ));
        let worker = JobWorker::new(store.clone(), reservations.clone(), notifier.clone(), config.jobs.clone());

        let state = Arc::new(AppState {
            config,
            movies: store.clone(),
            shows: store.clone(),
            bookings: store.clone(),
            users: store.clone(),
            reservations,
            tokens: TokenVerifier::from_secret(JWT_SECRET),
        });

        Harness {
            store,
            gateway,
            mailer,
            state,
            worker,
            notifier,
            scheduler,
        }
    }

    pub fn reservations(&self) -> &ReservationService {
        &self.state.reservations
    }

    pub fn notifier(&self) -> &BookingNotifier {
        &self.notifier
    }

    pub fn scheduler(&self) -> &JobScheduler {
        &self.scheduler
    }

    pub fn token(&self, user_id: &str) -> String {
        token_for_test(JWT_SECRET, user_id, None)
    }

    pub fn admin_token(&self, user_id: &str) -> String {
        token_for_test(JWT_SECRET, user_id, Some("admin"))
    }

    pub async fn seed_movie(&self, title: &str) -> ObjectId {
        self.store
            .insert_movie(&Movie {
                id: None,
                title: title.to_string(),
                duration: 155,
                description: None,
                poster: None,
            })
            .await
            .unwrap()
    }

    /// Inserts a "Dune" screening with no occupied seats.
    pub async fn seed_show(&self, price: f64) -> ObjectId {
        let movie_id = self.seed_movie("Dune").await;
        self.store
            .insert_show(&Show {
                id: None,
                movie_id,
                show_date_time: DateTime::from_millis(1_767_225_600_000),
                show_price: price,
                occupied_seats: Default::default(),
            })
            .await
            .unwrap()
    }

    pub async fn seed_user(&self, id: &str, email: &str) {
        self.store
            .create_user_if_absent(&User {
                id: id.to_string(),
                email: email.to_string(),
                name: "Test User".to_string(),
                image: None,
                favourites: vec![],
            })
            .await
            .unwrap();
    }
}
