//! Field-ops leader service binary.

use std::sync::Arc;
use std::time::Duration;

use fieldops_backend::config::Config;
use fieldops_backend::db::{self, Repository};
use fieldops_backend::{create_router, init_tracing, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting field-ops leader service");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (FIELDOPS_API_PSK). Authentication is disabled!");
    }

    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    db::spawn_ledger_sweeper(
        repo.clone(),
        config.operation_retention,
        Duration::from_secs(3600),
    );

    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
