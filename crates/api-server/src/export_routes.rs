//! On-demand CSV export of history plus forecast.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use dashboard_core::{Bar, DashboardError, ForecastSeries};
use serde::Deserialize;

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub horizon: Option<usize>,
}

pub fn export_routes() -> Router<AppState> {
    Router::new().route("/api/export/:symbol", get(export_csv))
}

async fn export_csv(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    let days = query.days.unwrap_or(365).min(1830);
    let horizon = query.horizon.unwrap_or(30).min(365);

    let bars = state.orchestrator.history(&symbol, days).await?;
    // The forecast section is optional in the export: short histories
    // still produce a valid history-only CSV.
    let forecast = state.orchestrator.forecast(&symbol, horizon).await.ok();

    let body = build_csv(&bars, forecast.as_ref())?;
    let filename = format!("attachment; filename=\"{symbol}.csv\"");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    )
        .into_response())
}

/// Rows: date, value, kind (history close or forecast point).
fn build_csv(bars: &[Bar], forecast: Option<&ForecastSeries>) -> Result<String, DashboardError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["date", "value", "kind"])
        .map_err(|e| DashboardError::Export(e.to_string()))?;

    for bar in bars {
        writer
            .write_record([
                bar.timestamp.date_naive().to_string(),
                format!("{:.4}", bar.close),
                "history".to_string(),
            ])
            .map_err(|e| DashboardError::Export(e.to_string()))?;
    }

    if let Some(series) = forecast {
        for point in &series.points {
            writer
                .write_record([
                    point.date.to_string(),
                    format!("{:.4}", point.value),
                    "forecast".to_string(),
                ])
                .map_err(|e| DashboardError::Export(e.to_string()))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::Export(e.to_string()))
}
