//! Counter snapshot.

use axum::Router;
use axum::extract::State;
use axum::response::Response;
use axum::routing::get;

use relay_common::error::AppError;

use crate::routes::pretty_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/stats", get(stats))
}

/// GET /stats — Current counters with a refreshed `running.now`.
async fn stats(State(state): State<AppState>) -> Result<Response, AppError> {
    pretty_json(&state.stats.snapshot())
}
