use configs::AppConfig;
use dotenvy::dotenv;
use migration::{Migrator, MigratorTrait};
use service::rbac_service;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::errors::StartupError;
use crate::routes;
use crate::state::AppState;

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl_c handler failed; shutting down");
    }
    info!("shutdown signal received");
}

/// Load configuration and prepare everything the router needs.
pub async fn build_state(config: AppConfig) -> Result<AppState, StartupError> {
    common::env::ensure_env(&config.server.data_dir).await?;

    let db = models::db::connect_with_config(&config.database).await.map_err(|e| StartupError::Database(e.to_string()))?;
    Migrator::up(&db, None).await.map_err(|e| StartupError::Database(e.to_string()))?;
    rbac_service::ensure_defaults(&db).await.map_err(|e| StartupError::Database(e.to_string()))?;

    Ok(AppState::new(db, config))
}

/// Public entry: build the app and run the HTTP server until ctrl-c.
pub async fn run() -> anyhow::Result<()> {
    dotenv().ok();
    let config = AppConfig::load_or_env().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    common::utils::logging::init_logging(config.server.json_logs);

    let addr = config.server.bind_addr();
    let state = build_state(config).await?;
    let app = routes::build_router(state, build_cors());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "booking server listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}
