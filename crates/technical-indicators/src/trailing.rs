use dashboard_core::{Bar, TrailingStopMethod, TrailingStopPlan};

use crate::atr;

/// Percentage trailing stop: running maximum close times (1 - pct).
pub fn trailing_stop_pct(bars: &[Bar], pct: f64) -> Vec<f64> {
    if bars.is_empty() || !(0.0..1.0).contains(&pct) {
        return vec![];
    }

    let mut stops = Vec::with_capacity(bars.len());
    let mut high_water = f64::NEG_INFINITY;

    for bar in bars {
        if bar.close > high_water {
            high_water = bar.close;
        }
        stops.push(high_water * (1.0 - pct));
    }

    stops
}

/// ATR trailing stop: running maximum close minus `multiple` ATRs.
/// The first `period` bars have no ATR and are skipped, so the output is
/// aligned to `bars[period..]`.
pub fn trailing_stop_atr(bars: &[Bar], period: usize, multiple: f64) -> Vec<f64> {
    let atr_values = atr(bars, period);
    if atr_values.is_empty() || multiple <= 0.0 {
        return vec![];
    }

    let offset = bars.len() - atr_values.len();
    let mut high_water = bars[..offset]
        .iter()
        .map(|b| b.close)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut stops = Vec::with_capacity(atr_values.len());
    for (i, atr_val) in atr_values.iter().enumerate() {
        let close = bars[offset + i].close;
        if close > high_water {
            high_water = close;
        }
        stops.push(high_water - multiple * atr_val);
    }

    stops
}

/// Build a trailing-stop plan for the series end state.
pub fn trailing_stop_plan(bars: &[Bar], method: TrailingStopMethod) -> Option<TrailingStopPlan> {
    let stops = match method {
        TrailingStopMethod::Percent { pct } => trailing_stop_pct(bars, pct),
        TrailingStopMethod::Atr { period, multiple } => trailing_stop_atr(bars, period, multiple),
    };

    let current_stop = *stops.last()?;
    let last_close = bars.last()?.close;
    if last_close <= 0.0 {
        return None;
    }

    Some(TrailingStopPlan {
        method,
        current_stop,
        distance_pct: (last_close - current_stop) / last_close,
        breached: last_close < current_stop,
        stops,
    })
}
