//! Wardrobe: clothing lending library server
//!
//! Librarians catalog garments into collections, patrons browse, borrow and
//! rate them, and private collections are shared through invites. Exposed as
//! a REST JSON API.

use std::sync::Arc;

pub mod access;
pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod storage;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
