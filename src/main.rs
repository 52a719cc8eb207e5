mod auth;
mod config;
mod db;
mod errors;
mod handlers;
mod loan;
mod models;
mod scoring;
mod service;
mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::scoring::ScoringPolicy;
use crate::service::{ScoringService, SystemClock};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Database connection and schema bootstrap.
/// - The per-subject score breakdown cache.
/// - The scoring service.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rust_riskscore_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Initialize database connection pool and make sure the ledger tables exist
    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");
    db.ensure_schema().await?;
    tracing::info!("Ledger schema ensured");

    // Per-subject cache of the current score breakdown. The rescore path
    // refreshes it on every write; the TTL bounds recency-window staleness
    // for subjects nobody is writing to.
    let score_cache = Cache::builder()
        .time_to_live(Duration::from_secs(config.score_cache_ttl_secs))
        .max_capacity(10_000)
        .build();
    tracing::info!(
        "Score breakdown cache initialized ({}s TTL, 10k capacity)",
        config.score_cache_ttl_secs
    );

    // The scoring service owns the atomic rescore protocol. Production uses
    // the system clock; tests inject a fixed one.
    let scoring = Arc::new(ScoringService::new(
        db.pool.clone(),
        ScoringPolicy::default(),
        Arc::new(SystemClock),
    ));
    tracing::info!("Scoring service initialized with default policy");

    // Build application state
    let app_state = Arc::new(handlers::AppState {
        db: db.pool.clone(),
        config: config.clone(),
        scoring,
        score_cache,
    });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        // Auth endpoints
        .route("/api/v1/auth/register", post(handlers::register))
        .route("/api/v1/auth/login", post(handlers::login))
        // Ledger + dynamic scoring endpoints
        .route(
            "/api/v1/subjects/:subject_id/transactions",
            post(handlers::record_transaction)
                .get(handlers::list_transactions)
                .delete(handlers::clear_transactions),
        )
        .route(
            "/api/v1/subjects/:subject_id/score",
            get(handlers::get_score),
        )
        .route(
            "/api/v1/subjects/:subject_id/score/history",
            get(handlers::get_score_history),
        )
        // Loan application endpoints
        .route(
            "/api/v1/subjects/:subject_id/loan-applications",
            post(handlers::apply_loan),
        )
        .route(
            "/api/v1/subjects/:subject_id/credit-score",
            get(handlers::get_credit_score),
        )
        // Admin endpoints
        .route("/api/v1/admin/dashboard", get(handlers::admin_dashboard))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 1MB max payload (payloads here are tiny)
                .layer(RequestBodyLimitLayer::new(1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
