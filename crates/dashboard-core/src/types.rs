use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Latest quote for a ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub change_percent: Option<f64>,
    pub market_cap: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub currency: Option<String>,
}

/// Company fundamentals pulled from the provider.
/// Missing upstream fields stay `None` here; sentinel defaults are applied
/// at the valuation layer, not at the fetch layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fundamentals {
    pub symbol: String,
    pub revenue: Option<f64>,
    pub ebit: Option<f64>,
    pub net_income: Option<f64>,
    pub interest_expense: Option<f64>,
    pub total_debt: Option<f64>,
    pub total_cash: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub beta: Option<f64>,
    pub effective_tax_rate: Option<f64>,
    pub shares_outstanding: Option<f64>,
}

/// Entry scraped from the community watch-list page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub note: Option<String>,
}

/// A hard-coded default that stood in for a missing upstream field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssumedDefault {
    pub name: String,
    pub value: f64,
}

/// WACC decomposition. Weights sum to 1 for positive capital inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccBreakdown {
    pub cost_of_equity: f64,
    pub cost_of_debt_after_tax: f64,
    pub equity_weight: f64,
    pub debt_weight: f64,
    pub wacc: f64,
    pub assumed: Vec<AssumedDefault>,
}

/// Discounted-cash-flow valuation output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfValuation {
    pub enterprise_value: f64,
    pub equity_value: f64,
    pub fair_value_per_share: f64,
    pub discounted_cash_flows: Vec<f64>,
    pub terminal_value: f64,
    pub discounted_terminal_value: f64,
    pub discount_rate: f64,
    pub terminal_growth: f64,
    pub mid_year: bool,
    pub assumed: Vec<AssumedDefault>,
}

/// Price vs. fair value classification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "pct")]
pub enum FairValueVerdict {
    Undervalued(f64),
    Overvalued(f64),
    FairlyValued,
}

impl FairValueVerdict {
    /// Classify a market price against a fair-value estimate.
    /// Undervalued: price = fv * (1 - pct); Overvalued: price = fv * (1 + pct).
    pub fn classify(price: f64, fair_value: f64) -> Self {
        if price < fair_value {
            FairValueVerdict::Undervalued(1.0 - price / fair_value)
        } else if price > fair_value {
            FairValueVerdict::Overvalued(price / fair_value - 1.0)
        } else {
            FairValueVerdict::FairlyValued
        }
    }

    pub fn to_label(&self) -> &'static str {
        match self {
            FairValueVerdict::Undervalued(_) => "Undervalued",
            FairValueVerdict::Overvalued(_) => "Overvalued",
            FairValueVerdict::FairlyValued => "Fairly Valued",
        }
    }
}

/// Full valuation section for one ticker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    pub symbol: String,
    pub price: f64,
    pub wacc: WaccBreakdown,
    pub dcf: DcfValuation,
    pub verdict: FairValueVerdict,
}

/// Single forecasted value on a future business day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Fixed-horizon forecast re-indexed onto future business days
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub symbol: String,
    /// Model description, e.g. "ARIMA(2,1,1)"
    pub model: String,
    pub points: Vec<ForecastPoint>,
}

/// How a trailing stop is derived from the price series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum TrailingStopMethod {
    Percent { pct: f64 },
    Atr { period: usize, multiple: f64 },
}

/// Trailing-stop levels over the series plus the current state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopPlan {
    pub method: TrailingStopMethod,
    pub stops: Vec<f64>,
    pub current_stop: f64,
    /// (close - stop) / close
    pub distance_pct: f64,
    pub breached: bool,
}

/// Indicator summary for the dashboard widgets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub symbol: String,
    pub last_close: f64,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub ema_12: Option<f64>,
    pub ema_26: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_histogram: Option<f64>,
    pub trailing_stop: Option<TrailingStopPlan>,
}

/// One ticker's assembled dashboard. Sections degrade independently:
/// a failed section is `None` with its error string recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerDashboard {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub quote: Option<QuoteSnapshot>,
    pub indicators: Option<IndicatorSummary>,
    pub valuation: Option<ValuationReport>,
    pub forecast: Option<ForecastSeries>,
    #[serde(default)]
    pub errors: Vec<String>,
}
