//! AlertRelay binary entrypoint: cycle scheduler plus HTTP status surface.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use relay_common::config::{EnvConfigSource, ServerConfig};
use relay_common::stats::StatsTracker;
use relay_engine::scheduler::{AzureTwilioFactory, CycleScheduler};

use relay_api::routes::create_router;
use relay_api::routes::info::local_hostname;
use relay_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(
                "relay_api=info,relay_engine=info,relay_queue=info,relay_notifier=info,tower_http=info",
            )
        }))
        .json()
        .init();

    tracing::info!("AlertRelay starting...");

    let server = ServerConfig::from_env()?;

    let stats = StatsTracker::new();
    let state = AppState::new(
        stats.handle(),
        Arc::new(EnvConfigSource),
        server.clone(),
        local_hostname().await,
    );

    let mut scheduler = CycleScheduler::new(EnvConfigSource, AzureTwilioFactory, stats);

    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Status server listening");

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        _ = scheduler.run() => {}
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Status server exited with error");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("AlertRelay stopped.");
    Ok(())
}
