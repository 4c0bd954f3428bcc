use axum::{extract::State, routing::get, Json, Router};

use crate::query::{self, Summary};
use crate::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/summary", get(handler))
}

/// `GET /api/summary` – the cleaning report of the last successful ingestion.
async fn handler(State(state): State<AppState>) -> Json<Summary> {
    // ---
    let report = state.report().await;
    Json(query::summarize(&report))
}
