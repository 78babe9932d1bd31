pub mod arima;
pub mod calendar;

pub use arima::*;
pub use calendar::*;

use dashboard_core::{Bar, DashboardError, ForecastPoint, ForecastSeries, SeriesForecaster};
use statrs::statistics::Statistics;

/// Auto-order ARIMA forecaster over daily closes, re-indexed onto future
/// business days.
pub struct ForecastEngine {
    max_p: usize,
    max_d: usize,
    max_q: usize,
}

impl ForecastEngine {
    pub fn new() -> Self {
        Self {
            max_p: 3,
            max_d: 2,
            max_q: 2,
        }
    }

    pub fn with_max_order(max_p: usize, max_d: usize, max_q: usize) -> Self {
        Self {
            max_p,
            max_d,
            max_q,
        }
    }

    /// Fit an auto-order model to the close series and forecast `horizon`
    /// future business days. `points.len() == horizon` always.
    pub fn forecast_prices(
        &self,
        symbol: &str,
        bars: &[Bar],
        horizon: usize,
    ) -> Result<ForecastSeries, DashboardError> {
        if horizon == 0 {
            return Err(DashboardError::InvalidData(
                "Forecast horizon must be positive".to_string(),
            ));
        }

        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        if closes.len() < 20 {
            return Err(DashboardError::InsufficientData(format!(
                "Need at least 20 closes to forecast {symbol}, got {}",
                closes.len()
            )));
        }

        let last_date = bars
            .last()
            .map(|b| b.timestamp.date_naive())
            .ok_or_else(|| DashboardError::InsufficientData("Empty series".to_string()))?;
        let dates = future_business_days(last_date, horizon);

        // A constant series makes every least-squares design singular in
        // spirit; short-circuit to a mean forecast.
        let (values, model_label) = if closes.as_slice().std_dev() < 1e-8 {
            let mean = closes.as_slice().mean();
            (vec![mean; horizon], "ARIMA(0,0,0)".to_string())
        } else {
            let model = select_order(&closes, self.max_p, self.max_d, self.max_q)?;
            tracing::debug!(
                "{symbol}: selected {} (aic {:.2}, sigma2 {:.6})",
                model.order,
                model.aic,
                model.sigma2
            );
            (model.forecast(horizon), model.order.to_string())
        };

        let points = dates
            .into_iter()
            .zip(values)
            .map(|(date, value)| ForecastPoint { date, value })
            .collect();

        Ok(ForecastSeries {
            symbol: symbol.to_string(),
            model: model_label,
            points,
        })
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesForecaster for ForecastEngine {
    fn forecast(
        &self,
        symbol: &str,
        bars: &[Bar],
        horizon: usize,
    ) -> Result<ForecastSeries, DashboardError> {
        self.forecast_prices(symbol, bars, horizon)
    }
}
