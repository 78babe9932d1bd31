//! Quote, history and indicator endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use dashboard_core::{Bar, IndicatorSummary, QuoteSnapshot};
use serde::Deserialize;

use crate::{ApiResponse, AppError, AppState};

#[derive(Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub days: Option<u32>,
}

pub fn market_routes() -> Router<AppState> {
    Router::new()
        .route("/api/quote/:symbol", get(get_quote))
        .route("/api/history/:symbol", get(get_history))
        .route("/api/indicators/:symbol", get(get_indicators))
}

async fn get_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<QuoteSnapshot>>, AppError> {
    let quote = state.orchestrator.quote(&symbol).await?;
    Ok(Json(ApiResponse::success(quote)))
}

async fn get_history(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<Bar>>>, AppError> {
    let days = query.days.unwrap_or(365).min(1830);
    let bars = state.orchestrator.history(&symbol, days).await?;
    Ok(Json(ApiResponse::success(bars)))
}

async fn get_indicators(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<IndicatorSummary>>, AppError> {
    let days = query.days.unwrap_or(365).min(1830);
    let summary = state.orchestrator.indicators(&symbol, days).await?;
    Ok(Json(ApiResponse::success(summary)))
}
