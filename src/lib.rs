pub mod app;
pub mod auth;
pub mod bookings;
pub mod config;
pub mod error;
pub mod extract;
pub mod state;
pub mod vehicles;
