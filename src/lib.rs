//! Noteful Backend Library
//!
//! Exposes the router and its building blocks for the binary and tests.

pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod notes;

pub use app::{router, AppState};
pub use config::Config;
pub use error::ApiError;
