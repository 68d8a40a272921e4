//! services/api/src/bin/api.rs

use api_lib::{
    adapters::db::DbAdapter,
    config::Config,
    error::ApiError,
    shutdown,
    web::{router, AppState},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!(
        max_connections = config.db.max_open_conns,
        min_connections = config.db.max_idle_conns,
        "Connecting to database..."
    );
    let db_pool = PgPoolOptions::new()
        .max_connections(config.db.max_open_conns)
        .min_connections(config.db.max_idle_conns)
        .idle_timeout(config.db.max_idle_time)
        .connect(&config.db.url)
        .await?;
    let db_adapter = DbAdapter::new(db_pool).with_query_timeout(config.db.query_timeout);
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState::new(db_adapter, config.clone()));
    let app = router(app_state);

    // --- 4. Start the Server ---
    info!(env = %config.env, "Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
