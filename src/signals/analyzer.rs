// =============================================================================
// Signal Analyzer — enriched rows -> ordered list of statements
// =============================================================================
//
// Looks at `last` and `prev` (plus up to three bars for candlestick shapes).
// Rules are evaluated independently, in a fixed order, and the output keeps
// that order:
//
//   1. MA regime           MA5 > MA20 > MA60  /  MA5 < MA20 < MA60
//   2. MA crossover        MA5 crossing MA20
//   3. KD crossover        K crossing D (oversold / overbought qualifier)
//   4. MACD histogram      sign flip
//   5. RSI threshold       > 70 / < 30
//   6. Bollinger breakout  close outside the bands
//   7. Single-bar move     > +3%, < -3%, |move| < 0.2%
//   8. Candlestick shapes  see `candlestick.rs`
//
// A rule whose inputs are absent simply does not fire. When nothing fires a
// single neutral "no clear signal" statement is returned.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::candlestick::detect_patterns;
use super::{SignalKind, SignalStatement};
use crate::indicators::rsi::{RSI_OVERBOUGHT, RSI_OVERSOLD};
use crate::indicators::IndicatorRow;
use crate::market_data::PriceBar;

/// K below this on a bullish cross is reported as an oversold reversal.
pub const KD_OVERSOLD: f64 = 30.0;
/// K above this on a bearish cross is reported as an overbought reversal.
pub const KD_OVERBOUGHT: f64 = 80.0;
/// Session move (close vs open) that counts as a strong bar.
pub const STRONG_BAR_MOVE: f64 = 0.03;
/// Session move below which the bar is an indecision bar.
pub const INDECISION_BAR_MOVE: f64 = 0.002;
/// Rows the analyzer needs before any rule can be evaluated.
pub const MIN_ROWS: usize = 2;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerOptions {
    /// Evaluate the candlestick-shape rules (stage 8).
    #[serde(default = "default_true")]
    pub candlestick_patterns: bool,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            candlestick_patterns: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SignalAnalyzer {
    options: AnalyzerOptions,
}

impl SignalAnalyzer {
    pub fn new(options: AnalyzerOptions) -> Self {
        Self { options }
    }

    /// Produce the statements for the tail of `rows`. Never fails: fewer than
    /// two rows yields a single neutral "insufficient data" statement.
    pub fn analyze(&self, rows: &[IndicatorRow]) -> Vec<SignalStatement> {
        if rows.len() < MIN_ROWS {
            return vec![SignalStatement::new(
                SignalKind::InsufficientData,
                format!(
                    "Insufficient data: need at least {MIN_ROWS} sessions, have {}",
                    rows.len()
                ),
            )];
        }

        let last = &rows[rows.len() - 1];
        let prev = &rows[rows.len() - 2];
        let mut out = Vec::new();

        ma_regime(last, &mut out);
        ma_crossover(prev, last, &mut out);
        kd_crossover(prev, last, &mut out);
        macd_flip(prev, last, &mut out);
        rsi_threshold(last, &mut out);
        bollinger_breakout(last, &mut out);
        single_bar_move(&last.bar, &mut out);

        if self.options.candlestick_patterns {
            let start = rows.len().saturating_sub(3);
            let bars: Vec<&PriceBar> = rows[start..].iter().map(|r| &r.bar).collect();
            out.extend(detect_patterns(&bars));
        }

        if out.is_empty() {
            out.push(SignalStatement::new(
                SignalKind::NoClearSignal,
                "No clear signal: indicators are not pointing in a direction",
            ));
        }

        debug!(
            date = %last.bar.date,
            count = out.len(),
            "signals evaluated"
        );
        out
    }
}

// =============================================================================
// Rules
// =============================================================================

fn ma_regime(last: &IndicatorRow, out: &mut Vec<SignalStatement>) {
    let (Some(m5), Some(m20), Some(m60)) = (last.ma5, last.ma20, last.ma60) else {
        return;
    };
    if m5 > m20 && m20 > m60 {
        out.push(SignalStatement::new(
            SignalKind::BullishAlignment,
            format!("Bullish alignment: MA5 {m5:.2} > MA20 {m20:.2} > MA60 {m60:.2}, uptrend intact"),
        ));
    } else if m5 < m20 && m20 < m60 {
        out.push(SignalStatement::new(
            SignalKind::BearishAlignment,
            format!("Bearish alignment: MA5 {m5:.2} < MA20 {m20:.2} < MA60 {m60:.2}, downtrend intact"),
        ));
    }
}

fn ma_crossover(prev: &IndicatorRow, last: &IndicatorRow, out: &mut Vec<SignalStatement>) {
    let (Some(p5), Some(p20), Some(l5), Some(l20)) = (prev.ma5, prev.ma20, last.ma5, last.ma20) else {
        return;
    };
    if p5 < p20 && l5 > l20 {
        out.push(SignalStatement::new(
            SignalKind::MaGoldenCross,
            "MA golden cross: MA5 crossed above MA20",
        ));
    } else if p5 > p20 && l5 < l20 {
        out.push(SignalStatement::new(
            SignalKind::MaDeathCross,
            "MA death cross: MA5 crossed below MA20",
        ));
    }
}

fn kd_crossover(prev: &IndicatorRow, last: &IndicatorRow, out: &mut Vec<SignalStatement>) {
    let (Some(pk), Some(pd), Some(lk), Some(ld)) = (prev.k, prev.d, last.k, last.d) else {
        return;
    };
    if pk < pd && lk > ld {
        let mut text = format!("KD golden cross: K {lk:.1} crossed above D {ld:.1}");
        if lk < KD_OVERSOLD {
            text.push_str(", oversold reversal");
        }
        out.push(SignalStatement::new(SignalKind::KdGoldenCross, text));
    } else if pk > pd && lk < ld {
        let mut text = format!("KD death cross: K {lk:.1} crossed below D {ld:.1}");
        if lk > KD_OVERBOUGHT {
            text.push_str(", overbought reversal");
        }
        out.push(SignalStatement::new(SignalKind::KdDeathCross, text));
    }
}

fn macd_flip(prev: &IndicatorRow, last: &IndicatorRow, out: &mut Vec<SignalStatement>) {
    let (Some(ph), Some(lh)) = (prev.hist, last.hist) else {
        return;
    };
    if ph < 0.0 && lh > 0.0 {
        out.push(SignalStatement::new(
            SignalKind::MacdTurnedPositive,
            "MACD histogram turned positive: momentum shifting up",
        ));
    } else if ph > 0.0 && lh < 0.0 {
        out.push(SignalStatement::new(
            SignalKind::MacdTurnedNegative,
            "MACD histogram turned negative: momentum shifting down",
        ));
    }
}

fn rsi_threshold(last: &IndicatorRow, out: &mut Vec<SignalStatement>) {
    let Some(rsi) = last.rsi else {
        return;
    };
    if rsi > RSI_OVERBOUGHT {
        out.push(SignalStatement::new(
            SignalKind::RsiOverbought,
            format!("RSI {rsi:.1} above {RSI_OVERBOUGHT}: overbought, watch for a pullback"),
        ));
    } else if rsi < RSI_OVERSOLD {
        out.push(SignalStatement::new(
            SignalKind::RsiOversold,
            format!("RSI {rsi:.1} below {RSI_OVERSOLD}: oversold, possible rebound opportunity"),
        ));
    }
}

fn bollinger_breakout(last: &IndicatorRow, out: &mut Vec<SignalStatement>) {
    let close = last.close();
    if let Some(up) = last.bb_up {
        if close > up {
            out.push(SignalStatement::new(
                SignalKind::BollingerBreakout,
                format!("Close {close:.2} above upper Bollinger band {up:.2}: strong breakout"),
            ));
            return;
        }
    }
    if let Some(low) = last.bb_low {
        if close < low {
            out.push(SignalStatement::new(
                SignalKind::BollingerBreakdown,
                format!("Close {close:.2} below lower Bollinger band {low:.2}: strong breakdown"),
            ));
        }
    }
}

fn single_bar_move(bar: &PriceBar, out: &mut Vec<SignalStatement>) {
    let Some(change) = bar.change_ratio() else {
        return;
    };
    let pct = change * 100.0;
    if change > STRONG_BAR_MOVE {
        out.push(SignalStatement::new(
            SignalKind::StrongBullishBar,
            format!("Strong bullish bar: +{pct:.2}% from the open"),
        ));
    } else if change < -STRONG_BAR_MOVE {
        out.push(SignalStatement::new(
            SignalKind::StrongBearishBar,
            format!("Strong bearish bar: {pct:.2}% from the open"),
        ));
    } else if change.abs() < INDECISION_BAR_MOVE {
        out.push(SignalStatement::new(
            SignalKind::IndecisionBar,
            format!("Indecision bar: close within {pct:.2}% of the open"),
        ));
    }
}
