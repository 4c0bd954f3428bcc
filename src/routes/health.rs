// src/routes/health.rs
//! API health check endpoint.
//!
//! Used by container orchestrators and the dashboard to verify that the
//! service is up. Follows EMBP: the handler stays private and the gateway
//! (`mod.rs`) merges the exported subrouter.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/api/health` endpoint.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Handle `GET /api/health`.
///
/// Does not touch the store, so it answers even while a reload is running.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Create a subrouter containing the `/api/health` route.
///
/// Generic over the application state so it merges with any gateway router.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/api/health", get(health))
}
