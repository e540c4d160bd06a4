//! Scan API Server
//!
//! REST surface over the product compliance scan pipeline:
//!
//! - Full catalog scans and single-product rescans
//! - Policy rule listing per market
//! - Dashboard notifications and per-product score history
//! - Scan schedule preferences
//!
//! The Shopify access token travels with each scan request in the
//! `X-Shopify-Access-Token` header; this server never stores it.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    routing::{get, post, put},
    Router,
};
use clap::Parser;
use scan_pipeline::PipelineConfig;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod error;
mod handlers;
mod models;
mod state;
mod store;

use state::AppState;

/// Command-line arguments for the scan API server
#[derive(Parser, Debug)]
#[command(name = "scan-api")]
#[command(about = "Product compliance scan API")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// SQLite connection string
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:scans.db?mode=rwc")]
    database_url: String,

    /// Rate limit: requests per second per IP
    #[arg(long, default_value = "10")]
    rate_limit: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Routes and shared middleware, without rate limiting
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Policy rules
        .route("/api/policies/:market", get(handlers::list_policies))
        // Scans
        .route("/api/scans", post(handlers::create_scan))
        .route("/api/scans/:id", get(handlers::get_scan))
        .route("/api/scans/:id/rescan", post(handlers::rescan_product))
        // Dashboard
        .route("/api/notifications", get(handlers::list_notifications))
        .route("/api/history", get(handlers::product_history))
        // Schedules
        .route("/api/schedules", put(handlers::upsert_schedule))
        .route("/api/schedules/:shop", get(handlers::get_schedule))
        // Apply middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(log_level.into())
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting scan API on {}:{}", args.host, args.port);

    let config = PipelineConfig::from_env()?;
    let state = Arc::new(AppState::connect(&args.database_url, config).await?);

    // Create rate limiter configuration
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(args.rate_limit.into())
            .burst_size(args.rate_limit.saturating_mul(2))
            .finish()
            .ok_or_else(|| anyhow!("invalid rate limit: {}", args.rate_limit))?,
    );

    let app = app(state).layer(GovernorLayer {
        config: governor_conf,
    });

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Rate limit: {} requests/second per IP", args.rate_limit);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
