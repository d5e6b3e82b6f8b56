//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::FullRepository;
use crate::services::directory::IdentityDirectory;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for store operations
    pub repository: Arc<dyn FullRepository>,
    /// External identity lookup for booking-party names
    pub directory: Arc<dyn IdentityDirectory>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        repository: Arc<dyn FullRepository>,
        directory: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            repository,
            directory,
        }
    }
}
