//! Typed validation errors for query parameters.
//!
//! Everything else in the service (ingestion, store, startup) reports through
//! `anyhow`; these are the errors a caller can fix by changing the request,
//! so the API layer turns them into `400 Bad Request`.

use thiserror::Error;

// ---

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    // ---
    #[error("unknown field '{0}', expected one of: temperature, salinity, odo")]
    UnknownField(String),

    #[error("unknown method '{0}', expected 'iqr' or 'zscore'")]
    UnknownMethod(String),

    #[error("parameter '{param}' must be a number, got '{value}'")]
    InvalidNumber { param: &'static str, value: String },

    #[error("parameter '{param}' must be a non-negative integer, got '{value}'")]
    InvalidCount { param: &'static str, value: String },

    #[error("parameter '{param}' must be an ISO-8601 date or date-time, got '{value}'")]
    InvalidTimestamp { param: &'static str, value: String },

    #[error("k must be a finite, non-negative number, got {0}")]
    InvalidK(f64),

    #[error("malformed query string: {0}")]
    MalformedQuery(String),
}
