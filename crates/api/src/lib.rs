//! HTTP status surface for AlertRelay.
//!
//! - `GET /healthz` — liveness check
//! - `GET /stats` — counter snapshot
//! - `GET /status` — readiness and masked configuration
//! - `GET /` — plain-text banner

pub mod routes;
pub mod state;
