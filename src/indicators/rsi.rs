// =============================================================================
// Relative Strength Index (RSI) — simple-average variant
// =============================================================================
//
// Step 1 — Compute price changes (deltas) from consecutive closes.
// Step 2 — Average the positive deltas and the magnitudes of the negative
//          deltas over a trailing window of `period` deltas (plain mean).
// Step 3 — RS  = avg_gain / avg_loss
//          RSI = 100 - 100 / (1 + RS)
//
// The first value needs `period` deltas, i.e. `period + 1` closes. An average
// loss of exactly zero leaves RS unmeasurable and the row undefined.
//
// Thresholds:  RSI > 70 => overbought,  RSI < 30 => oversold.
// =============================================================================

use super::rolling::rolling_mean;

pub const RSI_PERIOD: usize = 14;
pub const RSI_OVERBOUGHT: f64 = 70.0;
pub const RSI_OVERSOLD: f64 = 30.0;

/// RSI per close, aligned with `closes`.
pub fn calculate_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period + 1 {
        return out;
    }

    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| if *d > 0.0 { *d } else { 0.0 }).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| if *d < 0.0 { -d } else { 0.0 }).collect();

    let avg_gain = rolling_mean(&gains, period);
    let avg_loss = rolling_mean(&losses, period);

    // Delta `j` ends at close `j + 1`.
    for j in 0..deltas.len() {
        out[j + 1] = rsi_from_averages(avg_gain[j], avg_loss[j]);
    }
    out
}

/// Label for the latest value, used in log lines and the dashboard header.
pub fn rsi_zone(value: f64) -> &'static str {
    if value > RSI_OVERBOUGHT {
        "OVERBOUGHT"
    } else if value < RSI_OVERSOLD {
        "OVERSOLD"
    } else {
        "NEUTRAL"
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn rsi_from_averages(avg_gain: Option<f64>, avg_loss: Option<f64>) -> Option<f64> {
    let (gain, loss) = (avg_gain?, avg_loss?);
    if loss == 0.0 {
        return None;
    }
    let rs = gain / loss;
    let rsi = 100.0 - 100.0 / (1.0 + rs);
    rsi.is_finite().then_some(rsi)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_input() {
        assert!(calculate_rsi(&[], RSI_PERIOD).is_empty());
    }

    #[test]
    fn rsi_undefined_until_fourteen_deltas() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08,
            45.89, 46.03, 44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let rsi = calculate_rsi(&closes, RSI_PERIOD);
        assert_eq!(rsi.len(), closes.len());
        assert!(rsi[..14].iter().all(Option::is_none));
        assert!(rsi[14..].iter().all(Option::is_some));
        for v in rsi.iter().flatten() {
            assert!((0.0..=100.0).contains(v), "RSI {v} out of range");
        }
    }

    #[test]
    fn rsi_known_value() {
        // 14 deltas: seven +2, seven -1 -> avg gain 1.0, avg loss 0.5, RS 2.
        let mut closes = vec![100.0];
        for i in 0..14 {
            let last = *closes.last().unwrap();
            closes.push(if i % 2 == 0 { last + 2.0 } else { last - 1.0 });
        }
        let rsi = calculate_rsi(&closes, RSI_PERIOD);
        let expected = 100.0 - 100.0 / 3.0;
        assert!((rsi[14].unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn rsi_all_gains_is_undefined() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        assert!(calculate_rsi(&closes, RSI_PERIOD).iter().all(Option::is_none));
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let rsi = calculate_rsi(&closes, RSI_PERIOD);
        for v in rsi.iter().flatten() {
            assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
        }
        assert!(rsi[29].is_some());
    }

    #[test]
    fn zones() {
        assert_eq!(rsi_zone(75.0), "OVERBOUGHT");
        assert_eq!(rsi_zone(25.0), "OVERSOLD");
        assert_eq!(rsi_zone(70.0), "NEUTRAL");
    }
}
