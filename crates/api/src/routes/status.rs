//! Readiness and configuration report.

use std::collections::BTreeMap;

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;
use serde::Serialize;
use serde_json::Value;

use relay_common::error::AppError;

use crate::routes::pretty_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/status", get(status))
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Whether the configuration gate has ever opened.
    pub running: bool,
    pub environment: EnvironmentReport,
}

#[derive(Debug, Serialize)]
pub struct EnvironmentReport {
    /// Whether the current configuration would open the gate.
    pub complete: bool,
    /// Recognized keys, credential-like values masked.
    pub vars: BTreeMap<&'static str, Value>,
}

/// GET /status — Readiness plus the masked configuration as it reads right now.
async fn status(State(state): State<AppState>) -> Result<Response, AppError> {
    let config = state.config_source.load();
    let response = StatusResponse {
        running: state.stats.is_running(),
        environment: EnvironmentReport {
            complete: config.is_ready(),
            vars: config.masked_vars(),
        },
    };
    pretty_json(&response)
}
