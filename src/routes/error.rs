//! Error type returned by every handler in the `routes` gateway.
//!
//! Validation problems become `400` with the message the caller needs to fix
//! the request. Anything else is logged in full and reported as `500`.

use axum::extract::rejection::QueryRejection;
use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;
use tracing::{error, warn};

use crate::error::QueryError;

// ---

#[derive(Debug)]
pub enum ApiError {
    BadRequest(QueryError),
    Internal(anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        ApiError::BadRequest(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(QueryError::MalformedQuery(rejection.body_text()))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // ---
        let (status, message) = match self {
            ApiError::BadRequest(err) => {
                warn!("Rejected request: {}", err);
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Internal(err) => {
                error!("Request failed: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
