#[cfg(test)]
mod tests {
    use super::super::indicators::*;
    use super::super::summary::summarize;
    use super::super::trailing::*;
    use approx::assert_relative_eq;
    use dashboard_core::{Bar, TrailingStopMethod};
    use chrono::Utc;

    fn sample_prices() -> Vec<f64> {
        vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ]
    }

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Bar {
                timestamp: Utc::now() - chrono::Duration::days((closes.len() - i) as i64),
                open: close - 0.5,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }

    #[test]
    fn test_sma_basic() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = sma(&data, 3);

        assert_eq!(result.len(), 3);
        assert_relative_eq!(result[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(result[1], 3.0, epsilon = 1e-9);
        assert_relative_eq!(result[2], 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_sma_insufficient_data() {
        assert!(sma(&[1.0, 2.0], 5).is_empty());
        assert!(sma(&sample_prices(), 0).is_empty());
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let data = vec![22.0, 24.0, 23.0, 25.0, 26.0];
        let result = ema(&data, 3);

        assert_eq!(result.len(), data.len());
        let seed = (22.0 + 24.0 + 23.0) / 3.0;
        assert_relative_eq!(result[0], seed, epsilon = 1e-9);
    }

    #[test]
    fn test_ema_tracks_uptrend() {
        let data: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let result = ema(&data, 3);

        for w in result.windows(2) {
            assert!(w[1] > w[0]);
        }
    }

    #[test]
    fn test_rsi_bounds() {
        let result = rsi(&sample_prices(), 14);

        assert!(!result.is_empty());
        for v in &result {
            assert!((0.0..=100.0).contains(v));
        }
    }

    #[test]
    fn test_rsi_all_gains_saturates() {
        let data: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let result = rsi(&data, 14);

        assert!(result.iter().all(|&v| v > 99.0));
    }

    #[test]
    fn test_macd_produces_aligned_outputs() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let result = macd(&prices, 12, 26, 9);

        assert!(!result.macd_line.is_empty());
        assert_eq!(result.histogram.len(), result.signal_line.len());
    }

    #[test]
    fn test_macd_rejects_bad_periods_and_short_input() {
        let prices = sample_prices();
        assert!(macd(&prices, 26, 12, 9).macd_line.is_empty());
        assert!(macd(&prices, 0, 26, 9).macd_line.is_empty());
        // 20 points is shorter than the slow window
        assert!(macd(&prices, 12, 26, 9).macd_line.is_empty());
    }

    #[test]
    fn test_atr_positive_on_real_ranges() {
        let bars = bars_from_closes(&sample_prices());
        let result = atr(&bars, 14);

        assert!(!result.is_empty());
        assert!(result.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_trailing_stop_pct_is_highwater_times_factor() {
        let closes = vec![100.0, 105.0, 103.0, 110.0, 108.0, 104.0];
        let bars = bars_from_closes(&closes);
        let stops = trailing_stop_pct(&bars, 0.10);

        assert_eq!(stops.len(), bars.len());
        assert_relative_eq!(stops[0], 100.0 * 0.90, epsilon = 1e-9);
        assert_relative_eq!(stops[1], 105.0 * 0.90, epsilon = 1e-9);
        // High water stays at 105 through the dip
        assert_relative_eq!(stops[2], 105.0 * 0.90, epsilon = 1e-9);
        assert_relative_eq!(stops[3], 110.0 * 0.90, epsilon = 1e-9);
        assert_relative_eq!(stops[5], 110.0 * 0.90, epsilon = 1e-9);
    }

    #[test]
    fn test_trailing_stop_pct_never_lowers() {
        let bars = bars_from_closes(&sample_prices());
        let stops = trailing_stop_pct(&bars, 0.05);

        for w in stops.windows(2) {
            assert!(w[1] >= w[0]);
        }
    }

    #[test]
    fn test_trailing_stop_rejects_bad_pct() {
        let bars = bars_from_closes(&sample_prices());
        assert!(trailing_stop_pct(&bars, 1.5).is_empty());
        assert!(trailing_stop_pct(&bars, -0.1).is_empty());
    }

    #[test]
    fn test_trailing_stop_plan_breach() {
        // Ride up to 110 then crash through the 10% stop
        let closes = vec![100.0, 105.0, 110.0, 97.0];
        let bars = bars_from_closes(&closes);
        let plan = trailing_stop_plan(&bars, TrailingStopMethod::Percent { pct: 0.10 }).unwrap();

        assert_relative_eq!(plan.current_stop, 99.0, epsilon = 1e-9);
        assert!(plan.breached);
        assert!(plan.distance_pct < 0.0);
    }

    #[test]
    fn test_trailing_stop_atr_below_highwater() {
        let bars = bars_from_closes(&sample_prices());
        let stops = trailing_stop_atr(&bars, 14, 2.0);

        assert!(!stops.is_empty());
        let max_close = bars.iter().map(|b| b.close).fold(f64::NEG_INFINITY, f64::max);
        assert!(stops.iter().all(|&s| s < max_close));
    }

    #[test]
    fn test_summary_short_history_degrades_to_none() {
        let bars = bars_from_closes(&[100.0, 101.0, 102.0]);
        let summary = summarize("TEST", &bars).unwrap();

        assert_eq!(summary.last_close, 102.0);
        assert!(summary.sma_20.is_none());
        assert!(summary.sma_50.is_none());
        assert!(summary.rsi_14.is_none());
        assert!(summary.ema_26.is_none());
        assert!(summary.trailing_stop.is_some());
    }

    #[test]
    fn test_summary_empty_is_error() {
        assert!(summarize("TEST", &[]).is_err());
    }
}
