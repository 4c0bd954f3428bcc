//! Routes gateway (EMBP).
//!
//! Each sibling file owns one endpoint and exports a subrouter; this module
//! merges them and attaches the shared [`AppState`]. `main.rs` and the
//! integration tests only ever call [`router`].

use axum::Router;

use crate::AppState;

mod error;
mod health;
mod observations;
mod outliers;
mod params;
mod reload;
mod stats;
mod summary;

pub use error::ApiError;
pub use params::Params;

// ---

pub fn router(state: AppState) -> Router {
    // ---
    Router::new()
        .merge(observations::router())
        .merge(stats::router())
        .merge(outliers::router())
        .merge(summary::router())
        .merge(reload::router())
        .merge(health::router())
        .with_state(state)
}
