//! Pokedex API - Trainers, Pokemons and Battles
//!
//! A REST service exposing CRUD endpoints over trainers, the pokemons they
//! own and the battles fought between those pokemons.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::net::TcpListener;

mod api;
mod config;
mod domain;
mod error;
mod logging;
mod storage;

use crate::api::build_router;
use crate::config::Config;
use crate::storage::PokedexRepository;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database repository.
    pub repository: PokedexRepository,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    if let Err(e) = dotenvy::dotenv() {
        // Missing .env is expected in production
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Load configuration before logging so the output format is known
    let config = Config::load().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    logging::init(config.logging.format);

    tracing::info!("Starting Pokedex API v{}", env!("CARGO_PKG_VERSION"));

    let api_prefix = config.api_prefix();

    tracing::info!(
        host = %config.server.host,
        port = %config.server.port,
        database = %config.database.url,
        api_prefix = %api_prefix,
        "Configuration loaded"
    );

    // Connect to database
    let options = SqliteConnectOptions::from_str(&config.database.url)
        .map_err(|e| {
            tracing::error!(error = %e, "Invalid database URL");
            anyhow::anyhow!("Database configuration error: {}", e)
        })?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            anyhow::anyhow!("Database connection error: {}", e)
        })?;

    // Initialize repository and schema
    let repository = PokedexRepository::new(pool);
    repository.init_schema().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to initialize database schema");
        anyhow::anyhow!("Schema initialization error: {}", e)
    })?;

    tracing::info!("Database connected and schema initialized");

    let state = AppState { repository };

    // Build router
    let app = build_router(state, &api_prefix);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;

    tracing::info!(address = %addr, "Server listening");
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
