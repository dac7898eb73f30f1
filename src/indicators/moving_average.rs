// =============================================================================
// Simple Moving Averages of the close
// =============================================================================

use super::rolling::rolling_mean;

/// Windows the dashboard always computes.
pub const MA_WINDOWS: [usize; 4] = [5, 10, 20, 60];

/// Simple moving average of `closes` over `window` sessions. Element `i` is
/// defined only when `i + 1 >= window`.
pub fn calculate_sma(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_mean(closes, window)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_defined_from_window_onward() {
        let closes: Vec<f64> = (1..=70).map(|x| x as f64).collect();
        for window in MA_WINDOWS {
            let ma = calculate_sma(&closes, window);
            assert_eq!(ma.len(), closes.len());
            assert!(ma[..window - 1].iter().all(Option::is_none), "MA{window} defined too early");
            assert!(ma[window - 1..].iter().all(Option::is_some), "MA{window} missing");
        }
    }

    #[test]
    fn sma_known_value() {
        let ma = calculate_sma(&[10.0, 11.0, 12.0, 13.0, 14.0], 5);
        assert!((ma[4].unwrap() - 12.0).abs() < 1e-12);
    }
}
