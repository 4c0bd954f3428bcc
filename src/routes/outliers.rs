use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, info};

use super::{ApiError, Params};
use crate::query::{self, Filter, FilterParams, OutlierParams, OutlierQuery, OutlierReport};
use crate::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/outliers", get(handler))
}

/// `GET /api/outliers?field=&method=&k=` – on-demand outlier detection.
///
/// Range parameters narrow the set first; the method's statistics are then
/// computed over that subset only.
async fn handler(
    Params(outlier_params): Params<OutlierParams>,
    Params(filter_params): Params<FilterParams>,
    State(state): State<AppState>,
) -> Result<Json<OutlierReport>, ApiError> {
    // ---
    info!("GET /api/outliers - {:?} {:?}", outlier_params, filter_params);

    let outlier_query = OutlierQuery::try_from(&outlier_params)?;
    let filter = Filter::try_from(&filter_params)?;
    let observations = state.store.find_matching(&filter).await?;

    let report = query::detect_outliers(&observations, &outlier_query);
    debug!(
        "GET /api/outliers - {} {} k={} flagged {} of {}",
        report.method,
        report.field,
        report.k,
        report.outlier_count,
        observations.len()
    );
    Ok(Json(report))
}
