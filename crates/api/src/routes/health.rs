//! Liveness check.

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

/// GET /healthz — Always 200 with an empty body; does not reflect readiness.
async fn healthz() -> StatusCode {
    StatusCode::OK
}
