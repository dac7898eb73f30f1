// =============================================================================
// Bollinger Bands (20, 2)
// =============================================================================
//
// Middle band = SMA of the close, deviation = sample standard deviation of the
// same window, upper / lower = middle ± k * deviation.

use super::rolling::{rolling_mean, rolling_std};

pub const BB_PERIOD: usize = 20;
pub const BB_NUM_STD: f64 = 2.0;

#[derive(Debug, Clone, Default)]
pub struct BollingerSeries {
    pub mid: Vec<Option<f64>>,
    pub std: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn calculate_bollinger(closes: &[f64], period: usize, num_std: f64) -> BollingerSeries {
    let mid = rolling_mean(closes, period);
    let std = rolling_std(closes, period);

    let band = |sign: f64| -> Vec<Option<f64>> {
        mid.iter()
            .zip(&std)
            .map(|(m, s)| Some((*m)? + sign * num_std * (*s)?))
            .collect()
    };
    let upper = band(1.0);
    let lower = band(-1.0);

    BollingerSeries { mid, std, upper, lower }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_basic() {
        let closes: Vec<f64> = (1..=20).map(|x| x as f64).collect();
        let bb = calculate_bollinger(&closes, BB_PERIOD, BB_NUM_STD);
        assert!(bb.mid[18].is_none());
        let (mid, up, lo) = (bb.mid[19].unwrap(), bb.upper[19].unwrap(), bb.lower[19].unwrap());
        assert!((mid - 10.5).abs() < 1e-12);
        // Sample std of 1..=20 = sqrt(35)
        let sd = 35.0_f64.sqrt();
        assert!((bb.std[19].unwrap() - sd).abs() < 1e-9);
        assert!((up - (10.5 + 2.0 * sd)).abs() < 1e-9);
        assert!((lo - (10.5 - 2.0 * sd)).abs() < 1e-9);
    }

    #[test]
    fn bollinger_insufficient_data() {
        let bb = calculate_bollinger(&[1.0, 2.0, 3.0], BB_PERIOD, BB_NUM_STD);
        assert!(bb.upper.iter().all(Option::is_none));
    }

    #[test]
    fn bollinger_flat_collapses_bands() {
        let bb = calculate_bollinger(&[100.0; 20], BB_PERIOD, BB_NUM_STD);
        assert_eq!(bb.upper[19], Some(100.0));
        assert_eq!(bb.lower[19], Some(100.0));
    }
}
