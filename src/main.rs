use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};

mod chart;
mod config;
mod db;
mod llm;
mod util;
mod web;

use crate::config::{AppConfig, CliArgs};
use crate::llm::LlmClient;
use crate::util::logging::init_tracing;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let args = CliArgs::parse();

    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if !config.db_path().exists() {
        warn!(
            "Database file {} does not exist yet; queries will fail until it is created",
            config.database.path
        );
    }

    info!("Initializing LLM client with backend: {}", config.llm.backend);
    let llm = LlmClient::new(&config.llm)?;

    let app_state = Arc::new(AppState::new(config.clone(), llm));

    // Log what the model will see at startup; rebuilt fresh on every request.
    let snapshot = app_state.schema_snapshot().await;
    let table_count = snapshot.lines().filter(|l| l.starts_with("Table: ")).count();
    info!("Database catalog currently exposes {} tables", table_count);

    info!(
        "Starting nl-chart server on {}:{}",
        config.web.host, config.web.port
    );
    match web::run_server(config.web, app_state).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
