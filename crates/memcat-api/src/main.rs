//! # memcat-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the categorization engine and, when the
//! scheduler config is enabled, arms the periodic full run.

use memcat_api::state::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");
    let port = config.port;

    // Initialize database pool (optional; absent means in-memory only).
    let db_pool = memcat_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = memcat_api::bootstrap::build_state(config, db_pool)
        .await
        .map_err(|e| {
            tracing::error!("Bootstrap failed: {e}");
            e
        })?;

    let scheduler = state.scheduler.clone();
    if scheduler.state().snapshot().enabled {
        match scheduler.start().await {
            Ok(status) => tracing::info!(
                interval_secs = status.config.interval_secs,
                "scheduler armed"
            ),
            Err(e) => tracing::warn!("Scheduler not started: {e}"),
        }
    } else {
        tracing::info!("scheduler disabled; start it via POST /v1/scheduler/start");
    }

    let app = memcat_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("memcat API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    tracing::info!("memcat API stopped");
    Ok(())
}

/// Structured logging. `RUST_LOG` filters (default `info`);
/// `LOG_FORMAT=json` emits one JSON object per line.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
