use async_trait::async_trait;

use crate::{Bar, DashboardError, ForecastSeries, Fundamentals, QuoteSnapshot};

/// Trait for market-data providers
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn history(&self, symbol: &str, range_days: u32) -> Result<Vec<Bar>, DashboardError>;
    async fn quote(&self, symbol: &str) -> Result<QuoteSnapshot, DashboardError>;
    async fn fundamentals(&self, symbol: &str) -> Result<Fundamentals, DashboardError>;
}

/// Trait for time-series forecasters
pub trait SeriesForecaster: Send + Sync {
    fn forecast(&self, symbol: &str, bars: &[Bar], horizon: usize)
        -> Result<ForecastSeries, DashboardError>;
}
