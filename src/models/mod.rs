pub mod booking_model;
pub mod job_model;
pub mod movie_model;
pub mod show_model;
pub mod user_model;
