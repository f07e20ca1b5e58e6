use axum::Json;
use axum::routing::post;
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

use crate::error::AppError;
use crate::services::SyncSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct PendingResponse {
    pending: usize,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sync", post(sync_now))
        .route("/pending", get(pending))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn sync_now(State(state): State<AppState>) -> Result<Json<SyncSummary>, AppError> {
    let summary = state.sync.sync_all().await?;
    Ok(Json(summary))
}

async fn pending(State(state): State<AppState>) -> Result<Json<PendingResponse>, AppError> {
    let pending = state.sync.pending_count().await?;
    Ok(Json(PendingResponse { pending }))
}
