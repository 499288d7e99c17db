//! Plain-text banner.

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(banner))
}

/// GET / — Label, release and host identifier.
async fn banner(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain")],
        banner_text(&state.server.powered_by, &state.server.release, &state.host),
    )
}

pub fn banner_text(powered_by: &str, release: &str, host: &str) -> String {
    format!("Powered by {powered_by}\nRelease {release} on {host}\n")
}

/// Best-effort local host name: `$HOSTNAME`, then `/etc/hostname`, then "unknown".
pub async fn local_hostname() -> String {
    if let Ok(name) = std::env::var("HOSTNAME") {
        let name = name.trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }

    match tokio::fs::read_to_string("/etc/hostname").await {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => "unknown".to_string(),
    }
}
