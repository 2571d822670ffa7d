use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::chart::plan::{ChartPlan, DEFAULT_TITLE};
use crate::chart::strategy::{
    ChartStrategy, HeuristicStrategy, ModelAssistedStrategy, PlanContext, SuggestionSetStrategy,
};
use crate::chart::{build_config, instructor, render, ChartConfig};
use crate::db::executor::is_read_statement;
use crate::db::{QueryOutcome, ResultSet};
use crate::llm::sqlgen;
use crate::web::state::AppState;

// Query types

#[derive(Debug, Deserialize)]
pub struct NlQueryRequest {
    pub question: String,
    /// Generated SQL only runs when the caller confirms.
    #[serde(default)]
    pub execute: bool,
    /// Generated non-SELECT statements additionally need this.
    #[serde(default)]
    pub allow_writes: bool,
}

#[derive(Debug, Serialize)]
pub struct NlQueryResponse {
    pub question: String,
    pub sql: String,
    pub executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<QueryResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryResult {
    fn from_result_set(rs: &ResultSet, elapsed_ms: u64) -> Self {
        Self {
            columns: rs.columns.clone(),
            rows: rs.to_json_rows(),
            row_count: rs.row_count(),
            execution_time_ms: elapsed_ms,
        }
    }
}

// Chart types

#[derive(Debug, Deserialize)]
pub struct ChartRequest {
    /// Natural-language question; SQL is generated unless `sql` is set.
    pub question: Option<String>,
    /// Explicit SQL, bypassing synthesis.
    pub sql: Option<String>,
    /// "heuristic" (default), "suggest" or "model".
    pub strategy: Option<String>,
    /// Explicit chart-type hint, overrides inference.
    pub chart_type: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChartResponse {
    pub sql: String,
    pub plan: ChartPlan,
    pub config: ChartConfig,
    pub artifact_path: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestRequest {
    pub sql: String,
}

#[derive(Debug, Deserialize)]
pub struct InstructionRequest {
    pub instruction: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub table_count: usize,
}

// Natural language to SQL, with a confirm-before-execute gate.
pub async fn nl_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NlQueryRequest>,
) -> Result<Json<NlQueryResponse>, (StatusCode, String)> {
    info!("NL query: {}", payload.question);

    let sql = synthesize(&state, &payload.question).await?;

    if !payload.execute {
        return Ok(Json(NlQueryResponse {
            question: payload.question,
            sql,
            executed: false,
            result: None,
            note: Some("re-submit with execute=true to run this statement".to_string()),
        }));
    }

    if !is_read_statement(&sql) && !payload.allow_writes {
        return Ok(Json(NlQueryResponse {
            question: payload.question,
            sql,
            executed: false,
            result: None,
            note: Some(
                "generated statement is not a SELECT; re-submit with allow_writes=true to run it"
                    .to_string(),
            ),
        }));
    }

    let start = Instant::now();
    let outcome = state.run_sql(sql.clone()).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        QueryOutcome::Rows(rs) => Ok(Json(NlQueryResponse {
            question: payload.question,
            sql,
            executed: true,
            result: Some(QueryResult::from_result_set(&rs, elapsed_ms)),
            note: None,
        })),
        QueryOutcome::Write => Ok(Json(NlQueryResponse {
            question: payload.question,
            sql,
            executed: true,
            result: None,
            note: Some("statement executed successfully (no output)".to_string()),
        })),
        QueryOutcome::Failed(msg) => Err((StatusCode::BAD_REQUEST, format!("SQL error: {}", msg))),
    }
}

// Raw SQL execution.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteQueryRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    info!("Executing SQL query: {}", payload.query);

    let start = Instant::now();
    let outcome = state.run_sql(payload.query).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    match outcome {
        QueryOutcome::Rows(rs) => {
            let result = QueryResult::from_result_set(&rs, elapsed_ms);
            Ok(Json(serde_json::json!({
                "columns": result.columns,
                "rows": result.rows,
                "row_count": result.row_count,
                "execution_time_ms": result.execution_time_ms,
            })))
        }
        QueryOutcome::Write => Ok(Json(serde_json::json!({
            "success": true,
            "execution_time_ms": elapsed_ms,
        }))),
        QueryOutcome::Failed(msg) => Err((StatusCode::BAD_REQUEST, format!("SQL error: {}", msg))),
    }
}

// Current schema snapshot.
pub async fn get_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<String>, (StatusCode, String)> {
    let snapshot = state.schema_snapshot().await;
    if snapshot.is_empty() {
        return Err((
            StatusCode::NOT_FOUND,
            "no tables found in the database".to_string(),
        ));
    }
    Ok(Json(snapshot))
}

// Full query-to-visualization pipeline.
pub async fn generate_chart(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChartRequest>,
) -> Result<Json<ChartResponse>, (StatusCode, String)> {
    let sql = match (&payload.sql, &payload.question) {
        (Some(sql), _) => sql.clone(),
        (None, Some(question)) => synthesize(&state, question).await?,
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "either 'sql' or 'question' is required".to_string(),
            ))
        }
    };

    if !is_read_statement(&sql) {
        return Err((
            StatusCode::BAD_REQUEST,
            "charts can only be built from SELECT statements".to_string(),
        ));
    }

    let rows = fetch_rows(&state, sql.clone()).await?;
    if rows.is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "query returned no rows to chart".to_string(),
        ));
    }

    let ctx = PlanContext {
        question: payload.question.as_deref(),
        hint: payload.chart_type.as_deref(),
        title: payload.title.as_deref(),
    };

    let plan = match payload.strategy.as_deref().unwrap_or("heuristic") {
        "heuristic" => HeuristicStrategy.plan(&rows, &ctx).await,
        "suggest" => SuggestionSetStrategy.plan(&rows, &ctx).await,
        "model" => {
            ModelAssistedStrategy::new(Arc::clone(&state.llm))
                .plan(&rows, &ctx)
                .await
        }
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("unknown chart strategy: {}", other),
            ))
        }
    };

    let plan = plan.ok_or((
        StatusCode::UNPROCESSABLE_ENTITY,
        "could not determine an appropriate chart for this result".to_string(),
    ))?;

    let config = build_config(&rows, &plan)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;

    let artifact_path = render::write_html(&config, &state.config.chart_output_dir(), plan.kind)
        .map_err(|e| {
            error!("Failed to write chart artifact: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to write chart artifact: {}", e),
            )
        })?;

    Ok(Json(ChartResponse {
        sql,
        plan,
        config,
        artifact_path: artifact_path.display().to_string(),
    }))
}

// Candidate chart plans for a result set.
pub async fn chart_suggestions(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SuggestRequest>,
) -> Result<Json<Vec<ChartPlan>>, (StatusCode, String)> {
    if !is_read_statement(&payload.sql) {
        return Err((
            StatusCode::BAD_REQUEST,
            "suggestions need a SELECT statement".to_string(),
        ));
    }

    let rows = fetch_rows(&state, payload.sql).await?;
    let ctx = PlanContext {
        title: Some(DEFAULT_TITLE),
        ..Default::default()
    };
    Ok(Json(SuggestionSetStrategy.suggest(&rows, &ctx)))
}

// Chart plan from a free-form instruction, via the language model.
pub async fn chart_from_instruction(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<InstructionRequest>,
) -> Result<Json<ChartPlan>, (StatusCode, String)> {
    match instructor::extract_chart_plan(&state.llm, &payload.instruction).await {
        Some(plan) => Ok(Json(plan)),
        None => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "could not extract a chart plan from the instruction".to_string(),
        )),
    }
}

pub async fn system_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SystemStatus>, (StatusCode, String)> {
    let now = chrono::Utc::now();
    let uptime = now.signed_duration_since(state.startup_time).num_seconds();

    let snapshot = state.schema_snapshot().await;
    let table_count = snapshot.lines().filter(|l| l.starts_with("Table: ")).count();

    Ok(Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        table_count,
    }))
}

async fn synthesize(
    state: &Arc<AppState>,
    question: &str,
) -> Result<String, (StatusCode, String)> {
    let schema = state.schema_snapshot().await;
    if schema.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "no database tables found - add some data first".to_string(),
        ));
    }

    sqlgen::synthesize_sql(&state.llm, question, &schema)
        .await
        .map_err(|e| {
            error!("SQL synthesis failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("LLM error: {}", e))
        })
}

async fn fetch_rows(
    state: &Arc<AppState>,
    sql: String,
) -> Result<ResultSet, (StatusCode, String)> {
    match state.run_sql(sql).await {
        QueryOutcome::Rows(rs) => Ok(rs),
        QueryOutcome::Write => Err((
            StatusCode::BAD_REQUEST,
            "statement did not return rows".to_string(),
        )),
        QueryOutcome::Failed(msg) => Err((StatusCode::BAD_REQUEST, format!("SQL error: {}", msg))),
    }
}
