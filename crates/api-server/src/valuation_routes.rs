//! WACC + DCF valuation endpoint, including the full ticker dashboard.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use dashboard_core::{TickerDashboard, ValuationReport};

use crate::{ApiResponse, AppError, AppState};

pub fn valuation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/valuation/:symbol", get(get_valuation))
        .route("/api/dashboard/:symbol", get(get_dashboard))
}

async fn get_valuation(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<ValuationReport>>, AppError> {
    let report = state.orchestrator.valuation(&symbol).await?;
    Ok(Json(ApiResponse::success(report)))
}

/// Assembled dashboard; sections degrade independently and failures show
/// up in the `errors` list instead of failing the request.
async fn get_dashboard(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<ApiResponse<TickerDashboard>> {
    let dashboard = state.orchestrator.dashboard(&symbol).await;
    Json(ApiResponse::success(dashboard))
}
