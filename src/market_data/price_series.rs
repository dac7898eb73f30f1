use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Close above open ("red" candle on TWSE charts).
    pub fn is_rising(&self) -> bool {
        self.close > self.open
    }

    /// Close below open ("black" candle).
    pub fn is_falling(&self) -> bool {
        self.close < self.open
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn upper_shadow(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_shadow(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    /// Signed session change relative to the open, as a fraction.
    pub fn change_ratio(&self) -> Option<f64> {
        if self.open <= 0.0 {
            return None;
        }
        Some((self.close - self.open) / self.open)
    }

    /// Repair a raw upstream row so that `high >= max(open, close)` and
    /// `low <= min(open, close)`. Rows with non-finite or non-positive prices
    /// are rejected.
    fn normalised(mut self) -> Option<Self> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return None;
        }
        self.high = self.high.max(self.open).max(self.close);
        self.low = self.low.min(self.open).min(self.close);
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// PriceSeries -- ascending, unique dates, immutable once built
// ---------------------------------------------------------------------------

/// Ordered daily history for one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from raw bars in any order. Invalid rows are dropped,
    /// duplicate dates keep the last occurrence, output is sorted by date.
    pub fn new(raw: impl IntoIterator<Item = PriceBar>) -> Self {
        let mut by_date = BTreeMap::new();
        let mut dropped = 0usize;
        for bar in raw {
            match bar.normalised() {
                Some(bar) => {
                    by_date.insert(bar.date, bar);
                }
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!(dropped, "dropped invalid price rows");
        }
        Self {
            bars: by_date.into_values().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// The most recent `count` bars (all of them when shorter), oldest first.
    pub fn tail(&self, count: usize) -> &[PriceBar] {
        let start = self.bars.len().saturating_sub(count);
        &self.bars[start..]
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn bar(d: u32, close: f64) -> PriceBar {
        PriceBar::new(day(d), close, close + 1.0, close - 1.0, close, 1_000)
    }

    #[test]
    fn series_sorts_and_dedups() {
        let series = PriceSeries::new(vec![bar(3, 30.0), bar(1, 10.0), bar(3, 31.0), bar(2, 20.0)]);
        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![10.0, 20.0, 31.0]);
        let dates: Vec<_> = series.bars().iter().map(|b| b.date).collect();
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn invalid_rows_are_dropped() {
        let mut bad = bar(2, 20.0);
        bad.close = f64::NAN;
        let mut zero = bar(3, 20.0);
        zero.open = 0.0;
        let series = PriceSeries::new(vec![bar(1, 10.0), bad, zero]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn high_low_are_widened_to_cover_body() {
        let raw = PriceBar::new(day(1), 10.0, 10.5, 9.8, 11.0, 0);
        let series = PriceSeries::new(vec![raw]);
        let b = &series.bars()[0];
        assert_eq!(b.high, 11.0);
        assert_eq!(b.low, 9.8);
    }

    #[test]
    fn tail_handles_short_series() {
        let series = PriceSeries::new((1..=5).map(|d| bar(d, d as f64 * 10.0)));
        assert_eq!(series.tail(3).len(), 3);
        assert_eq!(series.tail(120).len(), 5);
        assert_eq!(series.tail(3)[0].close, 30.0);
    }

    #[test]
    fn candle_geometry() {
        let b = PriceBar::new(day(1), 10.0, 12.0, 7.0, 11.0, 0);
        assert!(b.is_rising());
        assert_eq!(b.body(), 1.0);
        assert_eq!(b.upper_shadow(), 1.0);
        assert_eq!(b.lower_shadow(), 3.0);
        assert!((b.change_ratio().unwrap() - 0.1).abs() < 1e-12);
    }
}
