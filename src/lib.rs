//! Water-quality observation pipeline for autonomous surface vehicle data.
//!
//! Raw CSV exports are normalized ([`normalize`]), cleaned of z-score
//! outliers ([`clean`]), stored ([`store`]) and served over a read-only JSON
//! API ([`routes`]) with filtering, statistics and on-demand outlier
//! detection ([`query`]).

pub mod clean;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod query;
pub mod routes;
pub mod schema;
pub mod state;
pub mod stats;
pub mod store;

#[cfg(test)]
pub mod test_utils;

pub use config::Config;

// Re-exported so modules reach shared types through the crate root rather
// than through each other's paths.
pub use models::{CleaningReport, Field, Observation};
pub use state::AppState;
pub use store::ObservationStore;
