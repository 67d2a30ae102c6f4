use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    http::{Method, header},
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod adapters;
mod api;
mod config;
mod crypto;
mod error;
mod middleware;
mod models;
mod registry;
mod retrieval;
mod store;
mod utils;

use adapters::AdapterRegistry;
use api::AppState;
use config::Config;
use crypto::CredentialStore;
use registry::IntegrationRegistry;
use retrieval::{DataRetrievalService, RetrievalSettings};
use store::{IntegrationStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "finboard_api=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config from environment; using defaults");
        Config::default()
    });

    // Secrets are resolved before anything touches the store: a missing
    // ENCRYPTION_KEY outside development aborts startup.
    let encryption_key = config.resolve_encryption_key()?;
    let admin_token = config.resolve_admin_token()?;

    let store: Arc<dyn IntegrationStore> = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(20)
                .min_connections(5)
                .acquire_timeout(std::time::Duration::from_secs(10))
                .idle_timeout(std::time::Duration::from_secs(300))
                .connect(database_url)
                .await?;

            tracing::info!("Connected to PostgreSQL");

            sqlx::migrate!("./migrations").run(&pool).await?;
            tracing::info!("Database migrations completed");

            Arc::new(PgStore::new(pool))
        }
        None if config.is_development() => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is ephemeral)");
            Arc::new(MemoryStore::new())
        }
        None => anyhow::bail!(
            "DATABASE_URL must be set when ENVIRONMENT is {:?}",
            config.environment
        ),
    };

    let crypto = Arc::new(CredentialStore::new(encryption_key.as_str()));
    let registry = IntegrationRegistry::new(store.clone(), crypto);
    let adapters = Arc::new(AdapterRegistry::with_defaults());

    if config.demo_mode {
        tracing::warn!("DEMO_MODE is on: all retrievals serve synthetic data");
    }
    let retrieval = Arc::new(DataRetrievalService::new(
        registry.clone(),
        adapters,
        RetrievalSettings {
            demo_mode: config.demo_mode,
            fetch_timeout: std::time::Duration::from_secs(config.fetch_timeout_secs),
            fetch_concurrency: config.fetch_concurrency,
        },
    ));

    let app_state = AppState {
        store,
        registry,
        retrieval,
        admin_token,
    };

    // Configure CORS - allow dashboard frontend origins
    // Supports comma-separated list of origins for multiple environments
    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".into());

    let origins: Vec<header::HeaderValue> = frontend_url
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(origins.clone())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-api-key"),
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600));

    tracing::info!("CORS configured for origins: {}", frontend_url);

    // Build router
    let app = Router::new()
        .route("/health", get(api::health::health_check))
        .route("/ping", get(api::health::ping))
        .nest("/v1", api::routes::v1_routes())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server_host, config.server_port).parse()?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
