use std::collections::BTreeMap;

use axum::{extract::State, routing::get, Json, Router};
use serde::Deserialize;
use tracing::info;

use super::{ApiError, Params};
use crate::query::{self, Filter, FieldStats, FilterParams};
use crate::{AppState, Field};

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/stats", get(handler))
}

#[derive(Debug, Deserialize)]
struct StatsParams {
    /// Comma-separated subset of `temperature,salinity,odo`.
    fields: Option<String>,
}

/// `GET /api/stats` – describe-style statistics per field.
///
/// Without range parameters this covers the whole store; with them, only the
/// matching observations. Pagination parameters are ignored.
async fn handler(
    Params(stats_params): Params<StatsParams>,
    Params(filter_params): Params<FilterParams>,
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<Field, FieldStats>>, ApiError> {
    // ---
    info!("GET /api/stats - {:?} {:?}", stats_params, filter_params);

    let fields = query::parse_fields(&stats_params.fields)?;
    let filter = Filter::try_from(&filter_params)?;
    let observations = state.store.find_matching(&filter).await?;

    Ok(Json(query::compute_stats(&observations, &fields)))
}
