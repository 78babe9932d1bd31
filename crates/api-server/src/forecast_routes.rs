//! ARIMA forecast endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use dashboard_core::ForecastSeries;
use serde::Deserialize;
use std::collections::HashMap;

use crate::{ApiResponse, AppError, AppState};

const MAX_HORIZON: usize = 365;

#[derive(Deserialize)]
pub struct ForecastQuery {
    #[serde(default)]
    pub horizon: Option<usize>,
}

#[derive(Deserialize)]
pub struct BatchForecastRequest {
    pub symbols: Vec<String>,
    #[serde(default)]
    pub horizon: Option<usize>,
}

pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/api/forecast/:symbol", get(get_forecast))
        .route("/api/forecast", post(post_batch_forecast))
}

async fn get_forecast(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ApiResponse<ForecastSeries>>, AppError> {
    let horizon = query.horizon.unwrap_or(30).min(MAX_HORIZON);
    let series = state.orchestrator.forecast(&symbol, horizon).await?;
    Ok(Json(ApiResponse::success(series)))
}

/// Independent per-series fits fanned across the worker pool. Failed fits
/// are simply absent from the response map.
async fn post_batch_forecast(
    State(state): State<AppState>,
    Json(request): Json<BatchForecastRequest>,
) -> Json<ApiResponse<HashMap<String, ForecastSeries>>> {
    let horizon = request.horizon.unwrap_or(30).min(MAX_HORIZON);
    let results = state.orchestrator.forecast_many(&request.symbols, horizon).await;
    Json(ApiResponse::success(results))
}
