// =============================================================================
// MACD (12, 26, 9)
// =============================================================================
//
//   MACD   = EMA_12(close) - EMA_26(close)
//   Signal = EMA_9(MACD)
//   Hist   = MACD - Signal
//
// EMAs are span-based without bias adjustment and start at the first close,
// so all three lines are defined from the first row.
// =============================================================================

use super::rolling::ewm_span;

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

#[derive(Debug, Clone, Default)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub hist: Vec<Option<f64>>,
}

pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal_span: usize) -> MacdSeries {
    let fast_ema = ewm_span(closes, fast);
    let slow_ema = ewm_span(closes, slow);

    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    // The signal line smooths the defined prefix of MACD.
    let defined: Vec<f64> = macd.iter().map_while(|v| *v).collect();
    let mut signal = ewm_span(&defined, signal_span);
    signal.resize(macd.len(), None);

    let hist = macd
        .iter()
        .zip(&signal)
        .map(|(m, s)| Some((*m)? - (*s)?))
        .collect();

    MacdSeries { macd, signal, hist }
}
