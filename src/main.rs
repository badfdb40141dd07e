use anyhow::Result;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod cache;
mod config;
mod models;
mod services;
mod util;

use cache::DetailsCache;
use config::AppConfig;
use services::manager::ServiceManager;

pub struct AppState {
    pub manager: ServiceManager,
    pub cache: Mutex<DetailsCache>,
    /// Single-flight gate for the whole aggregation pipeline: a second
    /// /details request while one is running is rejected, not queued.
    pub details_gate: tokio::sync::Mutex<()>,
}

#[cfg(test)]
impl AppState {
    pub(crate) fn for_tests() -> Self {
        let config = AppConfig::default();
        Self {
            manager: ServiceManager::new(&config),
            cache: Mutex::new(DetailsCache::new(config.cache_ttl())),
            details_gate: tokio::sync::Mutex::new(()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "steam_details=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = AppConfig::load();
    config.log_config();

    let state = Arc::new(AppState {
        manager: ServiceManager::new(&config),
        cache: Mutex::new(DetailsCache::new(config.cache_ttl())),
        details_gate: tokio::sync::Mutex::new(()),
    });

    // Warm up the services before accepting traffic. Best-effort: a cold
    // service retries lazily on its first request.
    state.manager.load_all().await;

    // Root handler
    async fn root_handler() -> &'static str {
        "Steam Details Server"
    }

    // Build router
    let app = Router::new()
        .route("/", get(root_handler).head(root_handler))
        .route("/health", get(|| async { "OK" }))
        .merge(api::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid bind address: {e}"))?;
    tracing::info!("Starting server on {}", addr);

    // Create shutdown signal listener
    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("Received Ctrl+C, shutting down..."),
            _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
        }
    };

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}
