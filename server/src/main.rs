//! Livehooks Server - Main Entry Point
//!
//! Webhook administration API and event fan-out.

use anyhow::{Context, Result};
use tracing::info;

use livehooks_server::webhooks::{HttpDeliveryWorker, WebhookStore};
use livehooks_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livehooks_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        last_used_policy = config.last_used_policy.as_str(),
        delivery_timeout_secs = config.delivery_timeout.as_secs(),
        "Starting Livehooks Server"
    );

    // Initialize database
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    let store = WebhookStore::new(pool);

    let worker = HttpDeliveryWorker::new(&config.user_agent, config.delivery_timeout)
        .context("Failed to build webhook HTTP client")?;

    // Build application state
    let state = api::AppState::new(store, worker, config.clone());

    // Build router
    let app = api::create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!(address = %config.bind_address, "Server listening");

    // Graceful shutdown handler
    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
