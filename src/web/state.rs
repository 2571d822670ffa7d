use crate::config::AppConfig;
use crate::db::catalog;
use crate::db::executor::{self, QueryOutcome};
use crate::llm::LlmClient;
use std::sync::Arc;
use tracing::error;

/// Shared application state for the web server. Immutable after startup:
/// every request opens its own database connection, so no mutable state is
/// shared across overlapping calls.
pub struct AppState {
    pub config: AppConfig,
    pub llm: Arc<LlmClient>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, llm: LlmClient) -> Self {
        Self {
            config,
            llm: Arc::new(llm),
            startup_time: chrono::Utc::now(),
        }
    }

    /// Rebuilds the schema snapshot from the live catalog. Always refetches;
    /// an empty string means the catalog is empty or unreachable.
    pub async fn schema_snapshot(&self) -> String {
        let db_path = self.config.db_path();
        match tokio::task::spawn_blocking(move || catalog::build_schema_snapshot(&db_path)).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Schema snapshot task failed: {}", e);
                String::new()
            }
        }
    }

    /// Runs one SQL statement on a fresh connection in a blocking task.
    pub async fn run_sql(&self, sql: String) -> QueryOutcome {
        let db_path = self.config.db_path();
        match tokio::task::spawn_blocking(move || executor::execute(&db_path, &sql)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Query task failed: {}", e);
                QueryOutcome::Failed(format!("query task failed: {}", e))
            }
        }
    }
}
