use std::sync::Arc;

use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::index::RollingIndex;
use crate::query::{AskError, QueryEngine};
use crate::stats::PipelineStats;

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<RollingIndex>,
    pub engine: Arc<QueryEngine>,
    pub stats: Arc<PipelineStats>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/latest", get(latest))
        .route("/health", get(health))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(serde::Deserialize)]
struct AskReq {
    question: String,
}

#[derive(serde::Serialize)]
struct ErrBody {
    error: &'static str,
    message: String,
}

async fn ask(State(state): State<AppState>, Json(body): Json<AskReq>) -> Response {
    match state.engine.ask(&body.question).await {
        Ok(resp) => (StatusCode::OK, Json(resp)).into_response(),
        Err(e) => {
            let (status, kind) = match &e {
                AskError::InvalidInput => (StatusCode::BAD_REQUEST, "invalid_input"),
                // Empty index is "not ready yet", not a server fault.
                AskError::NoContent => (StatusCode::SERVICE_UNAVAILABLE, "no_content"),
                AskError::EmbeddingFailed(_) => (StatusCode::BAD_GATEWAY, "embedding_failed"),
            };
            (
                status,
                Json(ErrBody {
                    error: kind,
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[derive(serde::Serialize)]
struct LatestOut {
    id: String,
    title: String,
    summary: String,
    source_url: String,
    published_at: u64,
    embedded_at: u64,
}

/// Most recent items, newest first, capped at 10.
async fn latest(State(state): State<AppState>) -> Json<Vec<LatestOut>> {
    let out = state
        .index
        .snapshot()
        .into_iter()
        .rev()
        .take(10)
        .map(|e| LatestOut {
            id: e.item.id.clone(),
            title: e.item.title.clone(),
            summary: e.item.display_text().to_string(),
            source_url: e.item.source_url.clone(),
            published_at: e.item.published_at,
            embedded_at: e.item.embedded_at,
        })
        .collect();
    Json(out)
}

#[derive(serde::Serialize)]
struct HealthOut {
    status: &'static str,
    indexed_news: usize,
    index_capacity: usize,
    published_total: u64,
    malformed_dropped: u64,
    last_ingest_run_ts: u64,
    last_index_apply_ts: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "ok",
        indexed_news: state.index.len(),
        index_capacity: state.index.capacity(),
        published_total: state.stats.published(),
        malformed_dropped: state.stats.malformed_dropped(),
        last_ingest_run_ts: state.stats.last_ingest_run(),
        last_index_apply_ts: state.stats.last_index_apply(),
    })
}
