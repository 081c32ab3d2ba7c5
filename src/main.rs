//! Twenty Questions - a 20 Questions game against a language-model oracle
//!
//! One process serves the credential-injecting relay and the JSON game API
//! that a browser front end drives.

mod api;
mod config;
mod game;
mod oracle;
mod relay;
mod score;

use api::{create_router, AppState, SharedGame};
use config::Config;
use oracle::{LoggingOracle, Oracle, RelayOracle};
use relay::Relay;
use score::{ScoreStore, SqliteScoreStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "twenty_questions=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = Config::from_env();

    // Ensure database directory exists
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::info!(path = %config.db_path.display(), "Opening score database");
    let store: Arc<dyn ScoreStore> = Arc::new(SqliteScoreStore::open(&config.db_path)?);

    let relay = Relay::new(config.relay.clone());
    if relay.config().api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY is not set; the relay will answer every request with 500");
    }
    tracing::info!(
        model = %relay.config().model,
        provider = %relay.config().provider_url,
        relay = %config.relay_url,
        "Oracle configured"
    );

    let relay_oracle: Arc<dyn Oracle> = Arc::new(RelayOracle::new(config.relay_url.clone()));
    let oracle: Arc<dyn Oracle> = Arc::new(LoggingOracle::new(relay_oracle));

    let game = SharedGame::new(oracle, store).await;
    let state = AppState::new(game, relay);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Twenty Questions server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
