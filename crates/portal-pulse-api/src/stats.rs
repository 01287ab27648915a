// Dashboard data route

use axum::{extract::State, routing::get, Json, Router};
use portal_pulse_core::{AggregationEngine, StatsResponse};
use std::sync::Arc;

/// App state for dashboard routes
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AggregationEngine>,
}

impl AppState {
    pub fn new(engine: AggregationEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

/// Create dashboard routes
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/data", get(get_stats))
        .with_state(state)
}

/// GET /data - Dashboard datasets over the rolling window
///
/// Datasets whose queries failed are left out.
#[utoipa::path(
    get,
    path = "/data",
    responses(
        (status = 200, description = "Dashboard datasets", body = StatsResponse)
    ),
    tag = "stats"
)]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.engine.build().await)
}
