use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use super::ApiError;
use crate::query::{self, Summary};
use crate::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/reload", post(handler))
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    run_id: Uuid,
    rows_read: usize,
    rows_rejected: usize,
    summary: Summary,
}

/// `POST /api/reload` – re-ingest the configured data source.
///
/// Fails with `500` and keeps serving the previous data if ingestion fails.
async fn handler(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    // ---
    info!("POST /api/reload - Starting ingestion");

    let outcome = state.reload().await?;

    info!(
        "POST /api/reload - Ingestion {} complete: {} rows read, {} rejected, {} stored",
        outcome.run_id, outcome.rows_read, outcome.rows_rejected, outcome.report.remaining_count
    );
    Ok(Json(ReloadResponse {
        run_id: outcome.run_id,
        rows_read: outcome.rows_read,
        rows_rejected: outcome.rows_rejected,
        summary: query::summarize(&outcome.report),
    }))
}
