use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers::api;
use super::state::AppState;

/// REST API for the query-to-visualization pipeline.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Query endpoints
            .route("/nl-query", post(api::nl_query))
            .route("/query", post(api::execute_query))
            // Schema introspection
            .route("/schema", get(api::get_schema))
            // Chart pipeline
            .route("/chart", post(api::generate_chart))
            .route("/chart/suggest", post(api::chart_suggestions))
            .route("/chart/plan", post(api::chart_from_instruction))
            // System status
            .route("/status", get(api::system_status)),
    )
}
