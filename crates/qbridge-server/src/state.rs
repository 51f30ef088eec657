//! Application state shared across handlers.

use std::sync::Arc;

use qbridge_oauth::{ApiClient, SharedAuthBroker};

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,

    /// Tenant-scoped API client (owns the authorization broker).
    pub api: ApiClient,
}

impl AppState {
    /// Create a new application state.
    pub fn new(api: ApiClient, config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            api,
        }
    }

    /// The authorization broker.
    pub fn broker(&self) -> &SharedAuthBroker {
        self.api.broker()
    }
}
