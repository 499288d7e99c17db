pub mod health;
pub mod info;
pub mod stats;
pub mod status;

use axum::Router;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use relay_common::error::AppError;

use crate::state::AppState;

/// Build the complete status router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(stats::router())
        .merge(status::router())
        .merge(info::router())
        .with_state(state)
}

/// Pretty-printed JSON response.
pub(crate) fn pretty_json<T: Serialize>(value: &T) -> Result<Response, AppError> {
    let body = serde_json::to_string_pretty(value)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}
