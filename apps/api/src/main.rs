//! API server entry point.
//!
//! ## Startup
//! 1. Tracing (`RUST_LOG`, default `info`)
//! 2. Configuration (`KASIR_CONFIG_DIR`/app.toml, then environment)
//! 3. SQLite pool + migrations
//! 4. Serve until SIGINT/SIGTERM, then close the pool

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use kasir_api::{create_app, AppConfig, AppState};
use kasir_db::{Database, DbConfig};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Load configuration
    let config_dir = std::env::var("KASIR_CONFIG_DIR").unwrap_or_else(|_| ".".to_string());
    let config = AppConfig::load(&config_dir).context("failed to load configuration")?;
    tracing::info!(
        db_source = %config.db_source,
        server_address = %config.server_address,
        "configuration loaded"
    );

    // 3. Connect to the database (runs migrations)
    let db_config = DbConfig::new(&config.db_source).max_connections(config.db_max_connections);
    let db = Database::new(db_config)
        .await
        .context("failed to open database")?;

    // 4. Build the application
    let app = create_app(AppState::new(db.clone(), config.order_timeout()));

    // 5. Start server
    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server_address))?;
    tracing::info!(addr = %config.server_address, "starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    tracing::info!("server shut down gracefully");
    Ok(())
}
