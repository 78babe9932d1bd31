pub mod export_routes;
pub mod forecast_routes;
pub mod market_routes;
pub mod valuation_routes;
pub mod watchlist_routes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use dashboard_core::DashboardError;
use dashboard_orchestrator::DashboardOrchestrator;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use yahoo_client::YahooClient;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<DashboardOrchestrator>,
}

/// Uniform JSON envelope for all routes
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler-level error: every failure becomes a JSON error string with a
/// status, the page-level catch of the dashboard.
#[derive(Debug)]
pub struct AppError(pub DashboardError);

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DashboardError::InvalidData(_) => StatusCode::BAD_REQUEST,
            DashboardError::InsufficientData(_) => StatusCode::NOT_FOUND,
            DashboardError::Calculation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DashboardError::Provider(_) | DashboardError::Scrape(_) => StatusCode::BAD_GATEWAY,
            DashboardError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::warn!("Request failed: {}", self.0);
        (status, Json(ApiResponse::<()>::error(self.0.to_string()))).into_response()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(market_routes::market_routes())
        .merge(valuation_routes::valuation_routes())
        .merge(forecast_routes::forecast_routes())
        .merge(watchlist_routes::watchlist_routes())
        .merge(export_routes::export_routes())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,yahoo_client=warn".into()),
        )
        .init();

    let source = Arc::new(YahooClient::new());
    let state = AppState {
        orchestrator: Arc::new(DashboardOrchestrator::new(source)),
    };

    let bind = std::env::var("MARKETDASH_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!("marketdash API listening on {bind}");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
