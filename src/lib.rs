pub mod app;
pub mod auth;
pub mod bookings;
pub mod cars;
pub mod config;
pub mod db_client;
pub mod error;
pub mod store;
pub mod users;
