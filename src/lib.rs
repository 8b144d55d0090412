//! School Library
//!
//! Book circulation server: a catalog of books with shelf counts, and the
//! borrow, renew and return rules librarians apply to students, served as a
//! REST JSON API with role-based authorization.

use std::sync::Arc;

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
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub repository: repository::Repository,
}

impl AppState {
    pub fn new(config: AppConfig, repository: repository::Repository) -> Self {
        let services = services::Services::new(repository.clone(), config.circulation.clone());
        Self {
            config: Arc::new(config),
            services: Arc::new(services),
            repository,
        }
    }
}
