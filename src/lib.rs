//! MeetCheck: event attendance over QR check-in tokens.
//!
//! Organizers create events and register participants, issue signed
//! check-in tokens that are rendered as QR codes, and read attendance
//! analytics. Participants (or a staff scanner) redeem the tokens at the
//! door; each participant is checked in at most once per event.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;
