//! Book Records
//!
//! A REST JSON server managing a catalog of book records: creation,
//! paginated listing, updates, soft deletion and statistics.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub services: std::sync::Arc<services::Services>,
}
