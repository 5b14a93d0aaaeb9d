pub mod admin_controller;
pub mod booking_controller;
pub mod clerk_webhook;
pub mod home_controller;
pub mod movie_controller;
pub mod show_controller;
pub mod stripe_webhook;
pub mod user_controller;
