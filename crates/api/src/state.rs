//! Shared application state for the status surface.

use std::sync::Arc;

use relay_common::config::{ConfigSource, ServerConfig};
use relay_common::stats::StatsHandle;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub stats: StatsHandle,
    /// Re-read on every `/status` request.
    pub config_source: Arc<dyn ConfigSource>,
    pub server: ServerConfig,
    /// Host identifier shown in the banner.
    pub host: String,
}

impl AppState {
    pub fn new(
        stats: StatsHandle,
        config_source: Arc<dyn ConfigSource>,
        server: ServerConfig,
        host: String,
    ) -> Self {
        Self {
            stats,
            config_source,
            server,
            host,
        }
    }
}
