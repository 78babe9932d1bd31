//! Community watch-list endpoint (scraped).

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use dashboard_core::WatchlistEntry;

use crate::{ApiResponse, AppError, AppState};

pub fn watchlist_routes() -> Router<AppState> {
    Router::new().route("/api/watchlist/:slug", get(get_watchlist))
}

async fn get_watchlist(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Vec<WatchlistEntry>>>, AppError> {
    let entries = state.orchestrator.watchlist(&slug).await?;
    Ok(Json(ApiResponse::success(entries)))
}
