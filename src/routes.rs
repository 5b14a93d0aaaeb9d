use axum::{
    extract::Extension,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::controllers::{
    admin_controller, booking_controller, clerk_webhook, home_controller, movie_controller, show_controller,
    stripe_webhook, user_controller,
};
use crate::state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home_controller::index))
        .route("/api/stripe", post(stripe_webhook::stripe_webhooks))
        .route("/api/clerk", post(clerk_webhook::clerk_webhooks))
        .route("/api/show/all", get(show_controller::load_shows))
        .route("/api/show/add", post(show_controller::add_show))
        .route("/api/show/:id", get(show_controller::fetch_show_by_id))
        .route(
            "/api/movies",
            get(movie_controller::load_movies).post(movie_controller::add_movie),
        )
        .route(
            "/api/movies/:id",
            get(movie_controller::load_movie_with_details)
                .patch(movie_controller::update_movie)
                .delete(movie_controller::delete_movie),
        )
        .route("/api/booking/create", post(booking_controller::create_booking))
        .route("/api/booking/seats/:show_id", get(booking_controller::get_occupied_seats))
        .route("/api/user/bookings", get(user_controller::get_user_bookings))
        .route("/api/user/update-favorite", post(user_controller::update_favourite))
        .route("/api/user/favorites", get(user_controller::get_favourites))
        .route("/api/admin/is-admin", get(admin_controller::is_admin))
        .route("/api/admin/all-bookings", get(admin_controller::all_bookings))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::app;
    use crate::store::UserStore;
    use crate::testing::Harness;

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn create_booking(token: Option<&str>, body: Value) -> Request<Body> {
        let mut request = Request::post("/api/booking/create").header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        request.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn home_reports_live() {
        let h = Harness::new();
        let response = app(h.state.clone())
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Server is Live!");
    }

    #[tokio::test]
    async fn booking_requires_a_session() {
        let h = Harness::new();
        let show_id = h.seed_show(10.0).await;
        let body = json!({ "showId": show_id.to_hex(), "selectedSeats": ["A1"] });

        let response = app(h.state.clone()).oneshot(create_booking(None, body.clone())).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(h.state.clone())
            .oneshot(create_booking(Some("not-a-jwt"), body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(h.store.show(show_id).unwrap().occupied_seats.is_empty());
    }

    #[tokio::test]
    async fn booking_returns_checkout_url_and_marks_seats() {
        let h = Harness::new();
        let show_id = h.seed_show(10.0).await;
        let token = h.token("user_u");

        let response = app(h.state.clone())
            .oneshot(create_booking(
                Some(&token),
                json!({ "showId": show_id.to_hex(), "selectedSeats": ["A1", "A2"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        let booking_id = body["bookingId"].as_str().unwrap().to_string();
        assert_eq!(body["url"], format!("https://checkout.test/{booking_id}"));

        let response = app(h.state.clone())
            .oneshot(
                Request::get(format!("/api/booking/seats/{}", show_id.to_hex()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["occupiedSeats"], json!(["A1", "A2"]));

        let response = app(h.state.clone())
            .oneshot(create_booking(
                Some(&h.token("user_v")),
                json!({ "showId": show_id.to_hex(), "selectedSeats": ["A2", "A3"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn malformed_show_id_is_a_bad_request() {
        let h = Harness::new();
        let response = app(h.state.clone())
            .oneshot(create_booking(
                Some(&h.token("user_u")),
                json!({ "showId": "nope", "selectedSeats": ["A1"] }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn user_sees_own_bookings_with_show_details() {
        let h = Harness::new();
        let show_id = h.seed_show(10.0).await;
        let token = h.token("user_u");
        app(h.state.clone())
            .oneshot(create_booking(
                Some(&token),
                json!({ "showId": show_id.to_hex(), "selectedSeats": ["B1"] }),
            ))
            .await
            .unwrap();

        let response = app(h.state.clone())
            .oneshot(
                Request::get("/api/user/bookings")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        let bookings = body["bookings"].as_array().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0]["bookedSeats"], json!(["B1"]));
        assert_eq!(bookings[0]["show"]["movie"]["title"], "Dune");
    }

    #[tokio::test]
    async fn admin_routes_check_the_role() {
        let h = Harness::new();
        let request = |token: String| {
            Request::get("/api/admin/is-admin")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let response = app(h.state.clone()).oneshot(request(h.token("user_u"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app(h.state.clone()).oneshot(request(h.admin_token("user_a"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["isAdmin"], true);
    }

    #[tokio::test]
    async fn favourites_toggle() {
        let h = Harness::new();
        let movie_id = h.seed_movie("Arrival").await;
        h.seed_user("user_u", "u@example.com").await;
        let token = h.token("user_u");
        let toggle = || {
            Request::post("/api/user/update-favorite")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "movieId": movie_id.to_hex() }).to_string()))
                .unwrap()
        };
        let list = || {
            Request::get("/api/user/favorites")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        app(h.state.clone()).oneshot(toggle()).await.unwrap();
        let body = body_json(app(h.state.clone()).oneshot(list()).await.unwrap()).await;
        assert_eq!(body["movies"][0]["title"], "Arrival");

        app(h.state.clone()).oneshot(toggle()).await.unwrap();
        let body = body_json(app(h.state.clone()).oneshot(list()).await.unwrap()).await;
        assert_eq!(body["movies"], json!([]));
    }

    #[tokio::test]
    async fn concurrent_favourite_toggles_keep_both_movies() {
        let h = Harness::new();
        let arrival = h.seed_movie("Arrival").await;
        let dune = h.seed_movie("Dune").await;
        h.seed_user("user_u", "u@example.com").await;
        let token = h.token("user_u");
        let toggle = |movie_id: mongodb::bson::oid::ObjectId| {
            Request::post("/api/user/update-favorite")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json!({ "movieId": movie_id.to_hex() }).to_string()))
                .unwrap()
        };

        let (first, second) = tokio::join!(
            app(h.state.clone()).oneshot(toggle(arrival)),
            app(h.state.clone()).oneshot(toggle(dune)),
        );
        assert_eq!(first.unwrap().status(), StatusCode::OK);
        assert_eq!(second.unwrap().status(), StatusCode::OK);

        let mut favourites = h.store.find_user("user_u").await.unwrap().unwrap().favourites;
        favourites.sort();
        let mut expected = vec![arrival, dune];
        expected.sort();
        assert_eq!(favourites, expected);
    }
}
