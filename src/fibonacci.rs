// =============================================================================
// Fibonacci Retracement Levels
// =============================================================================
//
//   level(ratio) = low + (high - low) * ratio
//
// `high` / `low` are the extremes of the trailing window (default 120 bars,
// or the whole series when shorter).
// =============================================================================

use serde::Serialize;

use crate::error::DashboardError;
use crate::market_data::PriceSeries;
use crate::types::FibonacciRatioSet;

pub const DEFAULT_WINDOW: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciLevel {
    /// Ratio rendered the way the table labels it, e.g. "0.382".
    pub label: String,
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciTable {
    pub ratio_set: FibonacciRatioSet,
    pub window: usize,
    pub high: f64,
    pub low: f64,
    pub levels: Vec<FibonacciLevel>,
}

#[derive(Debug, Clone, Copy)]
pub struct FibonacciCalculator {
    window: usize,
    ratio_set: FibonacciRatioSet,
}

impl Default for FibonacciCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, FibonacciRatioSet::Classic)
    }
}

impl FibonacciCalculator {
    pub fn new(window: usize, ratio_set: FibonacciRatioSet) -> Self {
        Self {
            window: window.max(1),
            ratio_set,
        }
    }

    /// Levels for the trailing window of `series`.
    pub fn calculate(&self, series: &PriceSeries) -> Result<FibonacciTable, DashboardError> {
        let bars = series.tail(self.window);
        if bars.is_empty() {
            return Err(DashboardError::InsufficientData {
                needed: 1,
                available: 0,
            });
        }
        let high = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
        let low = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
        Ok(self.levels_between(high, low, bars.len()))
    }

    fn levels_between(&self, high: f64, low: f64, window: usize) -> FibonacciTable {
        let levels = self
            .ratio_set
            .ratios()
            .iter()
            .map(|&ratio| FibonacciLevel {
                label: format_ratio(ratio),
                ratio,
                price: low + (high - low) * ratio,
            })
            .collect();
        FibonacciTable {
            ratio_set: self.ratio_set,
            window,
            high,
            low,
            levels,
        }
    }
}

/// "0.0", "0.382", "1.0": shortest decimal with at least one fractional digit.
fn format_ratio(ratio: f64) -> String {
    let s = format!("{ratio}");
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::PriceBar;
    use chrono::{Duration, NaiveDate};

    fn series(points: &[(f64, f64)]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        PriceSeries::new(points.iter().enumerate().map(|(i, &(high, low))| {
            let mid = (high + low) / 2.0;
            PriceBar::new(start + Duration::days(i as i64), mid, high, low, mid, 0)
        }))
    }

    fn price_for(t: &FibonacciTable, label: &str) -> Option<f64> {
        t.levels.iter().find(|l| l.label == label).map(|l| l.price)
    }

    fn approx(a: Option<f64>, b: f64) -> bool {
        a.map_or(false, |a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn classic_levels_between_0_and_100() {
        // Low of exactly 0 is not a valid price, so scale to 1..101 and shift.
        let s = series(&[(60.0, 1.0), (101.0, 40.0), (70.0, 30.0)]);
        let t = FibonacciCalculator::default().calculate(&s).unwrap();
        assert_eq!(t.high, 101.0);
        assert_eq!(t.low, 1.0);
        assert!(approx(price_for(&t, "0.0"), 1.0));
        assert!(approx(price_for(&t, "0.382"), 39.2));
        assert!(approx(price_for(&t, "0.5"), 51.0));
        assert!(approx(price_for(&t, "0.618"), 62.8));
        assert!(approx(price_for(&t, "1.0"), 101.0));
    }

    #[test]
    fn levels_for_high_100_low_0() {
        let t = FibonacciCalculator::default().levels_between(100.0, 0.0, 120);
        let labels: Vec<&str> = t.levels.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["0.0", "0.382", "0.5", "0.618", "1.0"]);
        assert!(approx(price_for(&t, "0.0"), 0.0));
        assert!(approx(price_for(&t, "0.382"), 38.2));
        assert!(approx(price_for(&t, "0.5"), 50.0));
        assert!(approx(price_for(&t, "0.618"), 61.8));
        assert!(approx(price_for(&t, "1.0"), 100.0));
    }

    #[test]
    fn extended_levels_for_high_100_low_0() {
        let calc = FibonacciCalculator::new(120, FibonacciRatioSet::Extended);
        let t = calc.levels_between(100.0, 0.0, 120);
        assert!(approx(price_for(&t, "0.191"), 19.1));
        assert!(approx(price_for(&t, "0.382"), 38.2));
        assert!(approx(price_for(&t, "0.5"), 50.0));
        assert!(approx(price_for(&t, "0.618"), 61.8));
        assert!(approx(price_for(&t, "0.809"), 80.9));
        assert!(price_for(&t, "1.0").is_none());
    }

    #[test]
    fn window_limits_lookback() {
        // An old spike outside the 2-bar window must not count.
        let s = series(&[(500.0, 1.0), (20.0, 10.0), (30.0, 15.0)]);
        let t = FibonacciCalculator::new(2, FibonacciRatioSet::Classic).calculate(&s).unwrap();
        assert_eq!(t.window, 2);
        assert_eq!(t.high, 30.0);
        assert_eq!(t.low, 10.0);
    }

    #[test]
    fn empty_series_is_insufficient() {
        let err = FibonacciCalculator::default().calculate(&PriceSeries::empty()).unwrap_err();
        assert!(matches!(err, DashboardError::InsufficientData { .. }));
    }
}
