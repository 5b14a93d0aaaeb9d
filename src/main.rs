use anyhow::anyhow;
use axum::http::{header, HeaderValue, Method};
use mongodb::{bson::doc, options::ClientOptions, Client};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

mod auth;
mod config;
mod controllers;
mod error;
mod identity;
mod jobs;
pub mod models;
mod notifications;
mod payments;
mod reservation;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod utils;

use shuttle_runtime::{SecretStore, Secrets};

use crate::auth::TokenVerifier;
use crate::config::Config;
use crate::jobs::{JobScheduler, JobWorker};
use crate::notifications::{BookingNotifier, LogMailer};
use crate::payments::StripeGateway;
use crate::reservation::ReservationService;
use crate::state::AppState;
use crate::store::MongoStore;

#[shuttle_runtime::main]
async fn main(#[Secrets] secret_store: SecretStore) -> shuttle_axum::ShuttleAxum {
    // Settings come from `Secrets.toml`.
    let config = Config::from_lookup(|key| secret_store.get(key)).map_err(|e| anyhow!(e))?;

    let client_options = ClientOptions::parse(&config.mongodb_uri)
        .await
        .map_err(|e| anyhow!("failed to parse MongoDB URI: {e}"))?;
    let client = Client::with_options(client_options).map_err(|e| anyhow!("failed to initialize MongoDB client: {e}"))?;

    // Ping the server to see if you can connect to the cluster
    let database = client.database(&config.database_name);
    database
        .run_command(doc! {"ping": 1}, None)
        .await
        .map_err(|e| anyhow!("failed to reach MongoDB: {e}"))?;
    tracing::info!(database = %config.database_name, "Connected to MongoDB");

    let store = Arc::new(MongoStore::new(database));
    store.ensure_indexes().await.map_err(|e| anyhow!(e))?;

    let gateway = Arc::new(StripeGateway::new(&config.stripe));
    let tokens = TokenVerifier::from_key(&config.clerk.jwt_key).map_err(|e| anyhow!(e))?;
    let scheduler = JobScheduler::new(store.clone());

    let reservations = Arc::new(ReservationService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        gateway,
        scheduler,
        config.booking.hold,
        config.stripe.currency.clone(),
    ));
    let notifier = Arc::new(BookingNotifier::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(LogMailer::new(&config.mail_from)),
        config.stripe.currency.clone(),
    ));

    let worker = JobWorker::new(store.clone(), reservations.clone(), notifier, config.jobs.clone());
    tokio::spawn(worker.run());

    let app_url = config
        .app_url
        .parse::<HeaderValue>()
        .map_err(|e| anyhow!("APP_URL is not a valid origin: {e}"))?;

    let state = Arc::new(AppState {
        config,
        movies: store.clone(),
        shows: store.clone(),
        bookings: store.clone(),
        users: store,
        reservations,
        tokens,
    });

    let app = routes::app(state).layer(
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_origin(app_url)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    );

    Ok(app.into())
}
