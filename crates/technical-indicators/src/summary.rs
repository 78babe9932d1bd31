use dashboard_core::{Bar, DashboardError, IndicatorSummary, TrailingStopMethod};

use crate::{ema, macd, rsi, sma, trailing_stop_plan};

/// Default trailing-stop percentage used by the dashboard widget
pub const DEFAULT_TRAIL_PCT: f64 = 0.08;

/// Compute the indicator summary the dashboard renders for one ticker.
/// Short histories produce `None` fields rather than errors; only an empty
/// series is rejected.
pub fn summarize(symbol: &str, bars: &[Bar]) -> Result<IndicatorSummary, DashboardError> {
    let last_close = bars
        .last()
        .map(|b| b.close)
        .ok_or_else(|| DashboardError::InsufficientData(format!("No bars for {symbol}")))?;

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let macd_result = macd(&closes, 12, 26, 9);

    Ok(IndicatorSummary {
        symbol: symbol.to_string(),
        last_close,
        sma_20: sma(&closes, 20).last().copied(),
        sma_50: sma(&closes, 50).last().copied(),
        ema_12: full_window_ema(&closes, 12),
        ema_26: full_window_ema(&closes, 26),
        rsi_14: rsi(&closes, 14).last().copied(),
        macd: macd_result.macd_line.last().copied(),
        macd_signal: macd_result.signal_line.last().copied(),
        macd_histogram: macd_result.histogram.last().copied(),
        trailing_stop: trailing_stop_plan(
            bars,
            TrailingStopMethod::Percent {
                pct: DEFAULT_TRAIL_PCT,
            },
        ),
    })
}

/// Last EMA value, but only when a full seed window was available.
fn full_window_ema(closes: &[f64], period: usize) -> Option<f64> {
    if closes.len() < period {
        return None;
    }
    ema(closes, period).last().copied()
}
