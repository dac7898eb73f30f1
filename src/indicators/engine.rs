// =============================================================================
// Indicator Engine — PriceSeries -> enriched rows
// =============================================================================
//
// Pure function of its input. Each stage fills its own columns; a stage that
// cannot run (too few bars, disabled) leaves them `None` and the rest of the
// table is still returned.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bollinger::{calculate_bollinger, BB_NUM_STD, BB_PERIOD};
use super::macd::{calculate_macd, MACD_FAST, MACD_SIGNAL, MACD_SLOW};
use super::moving_average::calculate_sma;
use super::rsi::{calculate_rsi, RSI_PERIOD};
use super::stochastic::calculate_kd;
use crate::market_data::{PriceBar, PriceSeries};

fn default_true() -> bool {
    true
}

/// Optional indicator stages. Moving averages are always computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorStages {
    #[serde(default = "default_true")]
    pub stochastic: bool,
    #[serde(default = "default_true")]
    pub macd: bool,
    #[serde(default = "default_true")]
    pub rsi: bool,
    #[serde(default = "default_true")]
    pub bollinger: bool,
}

impl Default for IndicatorStages {
    fn default() -> Self {
        Self {
            stochastic: true,
            macd: true,
            rsi: true,
            bollinger: true,
        }
    }
}

/// A price bar plus every derived column. A column is `None` until its
/// lookback window exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    #[serde(flatten)]
    pub bar: PriceBar,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
    pub rsv: Option<f64>,
    pub k: Option<f64>,
    pub d: Option<f64>,
    pub macd: Option<f64>,
    pub signal: Option<f64>,
    pub hist: Option<f64>,
    pub rsi: Option<f64>,
    pub bb_mid: Option<f64>,
    pub bb_std: Option<f64>,
    pub bb_up: Option<f64>,
    pub bb_low: Option<f64>,
}

impl IndicatorRow {
    pub fn from_bar(bar: PriceBar) -> Self {
        Self {
            bar,
            ma5: None,
            ma10: None,
            ma20: None,
            ma60: None,
            rsv: None,
            k: None,
            d: None,
            macd: None,
            signal: None,
            hist: None,
            rsi: None,
            bb_mid: None,
            bb_std: None,
            bb_up: None,
            bb_low: None,
        }
    }

    /// Moving average for one of the fixed windows (5, 10, 20, 60).
    pub fn ma(&self, window: usize) -> Option<f64> {
        match window {
            5 => self.ma5,
            10 => self.ma10,
            20 => self.ma20,
            60 => self.ma60,
            _ => None,
        }
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }
}

/// Builds the enriched table for a series.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine {
    stages: IndicatorStages,
}

impl IndicatorEngine {
    pub fn new(stages: IndicatorStages) -> Self {
        Self { stages }
    }

    /// Enrich `series`; output has the same length and order as the input.
    pub fn compute(&self, series: &PriceSeries) -> Vec<IndicatorRow> {
        let bars = series.bars();
        let mut rows: Vec<IndicatorRow> = bars.iter().cloned().map(IndicatorRow::from_bar).collect();
        if rows.is_empty() {
            return rows;
        }

        let closes = series.closes();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        fill(&mut rows, calculate_sma(&closes, 5), |r, v| r.ma5 = v);
        fill(&mut rows, calculate_sma(&closes, 10), |r, v| r.ma10 = v);
        fill(&mut rows, calculate_sma(&closes, 20), |r, v| r.ma20 = v);
        fill(&mut rows, calculate_sma(&closes, 60), |r, v| r.ma60 = v);

        if self.stages.stochastic {
            let kd = calculate_kd(&highs, &lows, &closes);
            fill(&mut rows, kd.rsv, |r, v| r.rsv = v);
            fill(&mut rows, kd.k, |r, v| r.k = v);
            fill(&mut rows, kd.d, |r, v| r.d = v);
        }

        if self.stages.macd {
            let m = calculate_macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
            fill(&mut rows, m.macd, |r, v| r.macd = v);
            fill(&mut rows, m.signal, |r, v| r.signal = v);
            fill(&mut rows, m.hist, |r, v| r.hist = v);
        }

        if self.stages.rsi {
            fill(&mut rows, calculate_rsi(&closes, RSI_PERIOD), |r, v| r.rsi = v);
        }

        if self.stages.bollinger {
            let bb = calculate_bollinger(&closes, BB_PERIOD, BB_NUM_STD);
            fill(&mut rows, bb.mid, |r, v| r.bb_mid = v);
            fill(&mut rows, bb.std, |r, v| r.bb_std = v);
            fill(&mut rows, bb.upper, |r, v| r.bb_up = v);
            fill(&mut rows, bb.lower, |r, v| r.bb_low = v);
        }

        debug!(rows = rows.len(), stages = ?self.stages, "indicators computed");
        rows
    }
}

/// Copy a computed column into the rows. A column of the wrong length is
/// ignored and the field stays absent.
fn fill<F>(rows: &mut [IndicatorRow], column: Vec<Option<f64>>, mut set: F)
where
    F: FnMut(&mut IndicatorRow, Option<f64>),
{
    if column.len() != rows.len() {
        debug!(expected = rows.len(), got = column.len(), "indicator column length mismatch");
        return;
    }
    for (row, value) in rows.iter_mut().zip(column) {
        set(row, value);
    }
}
