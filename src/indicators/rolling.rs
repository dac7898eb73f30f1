// =============================================================================
// Windowed aggregates over an ordered numeric sequence
// =============================================================================
//
// Every helper returns one `Option<f64>` per input element. An element is
// `None` until the full trailing window exists, and whenever the window holds
// a non-finite value. No value is ever back-filled or fabricated.
// =============================================================================

/// Apply `agg` to every complete trailing window of `values`.
fn rolling<F>(values: &[f64], window: usize, agg: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for end in window..=values.len() {
        let slice = &values[end - window..end];
        if slice.iter().all(|v| v.is_finite()) {
            out[end - 1] = agg(slice).filter(|v| v.is_finite());
        }
    }
    out
}

/// Simple moving average.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| Some(w.iter().sum::<f64>() / w.len() as f64))
}

/// Sample standard deviation (n - 1 denominator). A window of one has no
/// sample deviation and yields `None`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window < 2 {
        return vec![None; values.len()];
    }
    rolling(values, window, |w| {
        let n = w.len() as f64;
        let mean = w.iter().sum::<f64>() / n;
        let var = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Some(var.sqrt())
    })
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().copied().reduce(f64::min))
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |w| w.iter().copied().reduce(f64::max))
}

/// Span-based exponential smoothing without bias adjustment:
///
///   alpha = 2 / (span + 1)
///   y_0   = x_0
///   y_t   = alpha * x_t + (1 - alpha) * y_{t-1}
///
/// Defined from the first element. A non-finite input ends the series; later
/// elements stay `None`.
pub fn ewm_span(values: &[f64], span: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if span == 0 {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut prev: Option<f64> = None;
    for (i, &x) in values.iter().enumerate() {
        if !x.is_finite() {
            break;
        }
        let y = match prev {
            None => x,
            Some(p) => alpha * x + (1.0 - alpha) * p,
        };
        out[i] = Some(y);
        prev = Some(y);
    }
    out
}

/// Centre-of-mass exponential smoothing with bias adjustment (normalised
/// weights), over a series that may start with undefined elements:
///
///   alpha = 1 / (1 + com)
///   y_t   = sum_i (1 - alpha)^i * x_{t-i}  /  sum_i (1 - alpha)^i
///
/// Output is `None` up to the first defined input. A `None` after that point
/// yields `None` and leaves the running sums untouched.
pub fn ewm_com_adjusted(values: &[Option<f64>], com: f64) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if com < 0.0 {
        return out;
    }
    let decay = 1.0 - 1.0 / (1.0 + com);
    let mut num = 0.0_f64;
    let mut den = 0.0_f64;
    for (i, v) in values.iter().enumerate() {
        let Some(x) = v.filter(|x| x.is_finite()) else {
            continue;
        };
        num = x + decay * num;
        den = 1.0 + decay * den;
        out[i] = Some(num / den);
    }
    out
}
