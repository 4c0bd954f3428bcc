use axum::{extract::State, routing::get, Json, Router};
use tracing::{debug, info};

use super::{ApiError, Params};
use crate::query::{Filter, FilterParams, ObservationPage};
use crate::AppState;

// ---

pub fn router() -> Router<AppState> {
    // ---
    Router::new().route("/api/observations", get(handler))
}

/// `GET /api/observations` – filtered, paginated observations in time order.
async fn handler(
    Params(params): Params<FilterParams>,
    State(state): State<AppState>,
) -> Result<Json<ObservationPage>, ApiError> {
    // ---
    info!("GET /api/observations - {:?}", params);

    let filter = Filter::try_from(&params)?;
    let page = state.store.find_by_filter(&filter).await?;

    debug!(
        "GET /api/observations - returning {} of {} matches",
        page.returned, page.count
    );
    Ok(Json(page))
}
