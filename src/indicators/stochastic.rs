// =============================================================================
// Stochastic Oscillator (KD)
// =============================================================================
//
//   RSV = (close - lowest_low_9) / (highest_high_9 - lowest_low_9) * 100
//   K   = EWM(RSV, com = 2, bias-adjusted)
//   D   = EWM(K,   com = 2, bias-adjusted)
//
// A flat 9-bar range would divide by zero; the range is replaced by
// `ZERO_RANGE_DENOMINATOR` instead. With a flat range the close equals the
// low, so RSV evaluates to exactly 0.
// =============================================================================

use super::rolling::{ewm_com_adjusted, rolling_max, rolling_min};

pub const KD_WINDOW: usize = 9;
pub const KD_SMOOTHING_COM: f64 = 2.0;
/// Substituted for `highest_high - lowest_low` when the range is zero.
pub const ZERO_RANGE_DENOMINATOR: f64 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct StochasticSeries {
    pub rsv: Vec<Option<f64>>,
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// Compute RSV, K and D for aligned `highs`, `lows` and `closes`.
///
/// Mismatched input lengths yield an all-undefined series the length of
/// `closes`.
pub fn calculate_kd(highs: &[f64], lows: &[f64], closes: &[f64]) -> StochasticSeries {
    let n = closes.len();
    if highs.len() != n || lows.len() != n {
        return StochasticSeries {
            rsv: vec![None; n],
            k: vec![None; n],
            d: vec![None; n],
        };
    }

    let lowest = rolling_min(lows, KD_WINDOW);
    let highest = rolling_max(highs, KD_WINDOW);

    let rsv: Vec<Option<f64>> = (0..n)
        .map(|i| {
            let (lo, hi) = (lowest[i]?, highest[i]?);
            let mut range = hi - lo;
            if range == 0.0 {
                range = ZERO_RANGE_DENOMINATOR;
            }
            let v = (closes[i] - lo) / range * 100.0;
            v.is_finite().then_some(v)
        })
        .collect();

    let k = ewm_com_adjusted(&rsv, KD_SMOOTHING_COM);
    let d = ewm_com_adjusted(&k, KD_SMOOTHING_COM);

    StochasticSeries { rsv, k, d }
}
