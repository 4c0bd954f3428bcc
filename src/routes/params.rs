//! Query-string extractor for the API routes.
//!
//! Same as axum's `Query`, but a string that does not deserialize (e.g. a
//! repeated key) is rejected with the JSON `{error}` body of [`ApiError`]
//! instead of axum's plain-text response.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use super::ApiError;

// ---

#[derive(Debug, Clone)]
pub struct Params<T>(pub T);

impl<T, S> FromRequestParts<S> for Params<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // ---
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Params(value))
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::error::QueryError;
    use crate::query::FilterParams;
    use axum::http::Request;
    use tokio_test::block_on;

    fn extract(uri: &str) -> Result<FilterParams, ApiError> {
        // ---
        let (mut parts, ()) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        block_on(Params::<FilterParams>::from_request_parts(&mut parts, &())).map(|Params(p)| p)
    }

    #[test]
    fn test_well_formed_query() {
        // ---
        let params = extract("/api/observations?min_temp=25&limit=10").unwrap();
        assert_eq!(params.min_temp.as_deref(), Some("25"));
        assert_eq!(params.limit.as_deref(), Some("10"));
    }

    #[test]
    fn test_repeated_key_is_a_bad_request() {
        // ---
        let err = extract("/api/observations?min_temp=1&min_temp=2").unwrap_err();
        assert!(
            matches!(err, ApiError::BadRequest(QueryError::MalformedQuery(_))),
            "{err:?}"
        );
    }
}
