// =============================================================================
// Candlestick Pattern Heuristics
// =============================================================================
//
// Shape rules over the last one to three bars. "Rising" means close > open
// (a red candle on TWSE charts), "falling" means close < open.
//
// Two-bar patterns need two bars, three-bar patterns need three; anything
// shorter is skipped silently. Within a pattern family (e.g. bullish vs
// bearish engulfing) at most one side can match; different families may fire
// together. Thresholds are fixed constants.
// =============================================================================

use super::{SignalKind, SignalStatement};
use crate::market_data::PriceBar;

/// Minimum body of the outer bars of a morning / evening star, as a fraction
/// of the bar's open.
pub const STAR_OUTER_BODY_MIN: f64 = 0.015;
/// Maximum body of the middle bar of a star, as a fraction of its open.
pub const STAR_MIDDLE_BODY_MAX: f64 = 0.005;
/// Long shadow must be at least this many bodies (hammer / shooting star).
pub const LONG_SHADOW_BODY_MULTIPLE: f64 = 2.0;
/// Opposite shadow may be at most this many bodies.
pub const SHORT_SHADOW_BODY_MULTIPLE: f64 = 1.0;

/// Evaluate every pattern in fixed order over the tail of `bars`.
pub fn detect_patterns(bars: &[&PriceBar]) -> Vec<SignalStatement> {
    let mut out = Vec::new();
    let n = bars.len();
    let last = match bars.last() {
        Some(b) => *b,
        None => return out,
    };
    let prev = (n >= 2).then(|| bars[n - 2]);
    let third = (n >= 3).then(|| (bars[n - 3], bars[n - 2], bars[n - 1]));

    // Cannon: rising-falling-rising (or the mirror) with the middle bar held
    // inside the first bar's body and the third bar closing beyond the first.
    if let Some((c1, c2, c3)) = third {
        if is_bullish_cannon(c1, c2, c3) {
            out.push(SignalStatement::new(
                SignalKind::BullishCannon,
                "Bullish cannon: two rising bars sandwich a falling bar, upside continuation",
            ));
        } else if is_bearish_cannon(c1, c2, c3) {
            out.push(SignalStatement::new(
                SignalKind::BearishCannon,
                "Bearish cannon: two falling bars sandwich a rising bar, downside continuation",
            ));
        }
    }

    if let Some(prev) = prev {
        if is_bullish_engulfing(prev, last) {
            out.push(SignalStatement::new(
                SignalKind::BullishEngulfing,
                format!(
                    "Bullish engulfing: today's body [{:.2}, {:.2}] swallows yesterday's falling body",
                    last.open, last.close
                ),
            ));
        } else if is_bearish_engulfing(prev, last) {
            out.push(SignalStatement::new(
                SignalKind::BearishEngulfing,
                format!(
                    "Bearish engulfing: today's body [{:.2}, {:.2}] swallows yesterday's rising body",
                    last.close, last.open
                ),
            ));
        }
    }

    if is_hammer(last) {
        out.push(SignalStatement::new(
            SignalKind::Hammer,
            "Hammer: long lower shadow, buyers defended the lows",
        ));
    }
    if is_shooting_star(last) {
        out.push(SignalStatement::new(
            SignalKind::ShootingStar,
            "Shooting star: long upper shadow, sellers rejected the highs",
        ));
    }

    if let Some((c1, c2, c3)) = third {
        if is_morning_star(c1, c2, c3) {
            out.push(SignalStatement::new(
                SignalKind::MorningStar,
                "Morning star: large falling bar, small pause, large rising bar",
            ));
        } else if is_evening_star(c1, c2, c3) {
            out.push(SignalStatement::new(
                SignalKind::EveningStar,
                "Evening star: large rising bar, small pause, large falling bar",
            ));
        }

        if is_three_rising(c1, c2, c3) {
            out.push(SignalStatement::new(
                SignalKind::ThreeRisingBars,
                "Three rising bars with higher closes: steady buying",
            ));
        } else if is_three_falling(c1, c2, c3) {
            out.push(SignalStatement::new(
                SignalKind::ThreeFallingBars,
                "Three falling bars with lower closes: steady selling",
            ));
        }
    }

    out
}

// ---------------------------------------------------------------------------
// Individual rules
// ---------------------------------------------------------------------------

fn is_bullish_cannon(c1: &PriceBar, c2: &PriceBar, c3: &PriceBar) -> bool {
    c1.is_rising()
        && c2.is_falling()
        && c3.is_rising()
        && c2.open <= c1.close
        && c2.close >= c1.open
        && c3.close > c1.close
}

fn is_bearish_cannon(c1: &PriceBar, c2: &PriceBar, c3: &PriceBar) -> bool {
    c1.is_falling()
        && c2.is_rising()
        && c3.is_falling()
        && c2.open >= c1.close
        && c2.close <= c1.open
        && c3.close < c1.close
}

fn is_bullish_engulfing(prev: &PriceBar, last: &PriceBar) -> bool {
    prev.is_falling() && last.is_rising() && last.open <= prev.close && last.close >= prev.open
}

fn is_bearish_engulfing(prev: &PriceBar, last: &PriceBar) -> bool {
    prev.is_rising() && last.is_falling() && last.open >= prev.close && last.close <= prev.open
}

fn is_hammer(bar: &PriceBar) -> bool {
    let body = bar.body();
    body > 0.0
        && bar.lower_shadow() >= LONG_SHADOW_BODY_MULTIPLE * body
        && bar.upper_shadow() <= SHORT_SHADOW_BODY_MULTIPLE * body
}

fn is_shooting_star(bar: &PriceBar) -> bool {
    let body = bar.body();
    body > 0.0
        && bar.upper_shadow() >= LONG_SHADOW_BODY_MULTIPLE * body
        && bar.lower_shadow() <= SHORT_SHADOW_BODY_MULTIPLE * body
}

fn body_ratio(bar: &PriceBar) -> f64 {
    if bar.open > 0.0 {
        bar.body() / bar.open
    } else {
        0.0
    }
}

fn is_morning_star(c1: &PriceBar, c2: &PriceBar, c3: &PriceBar) -> bool {
    c1.is_falling()
        && body_ratio(c1) > STAR_OUTER_BODY_MIN
        && body_ratio(c2) < STAR_MIDDLE_BODY_MAX
        && c3.is_rising()
        && body_ratio(c3) > STAR_OUTER_BODY_MIN
        && c3.close > (c1.open + c1.close) / 2.0
}

fn is_evening_star(c1: &PriceBar, c2: &PriceBar, c3: &PriceBar) -> bool {
    c1.is_rising()
        && body_ratio(c1) > STAR_OUTER_BODY_MIN
        && body_ratio(c2) < STAR_MIDDLE_BODY_MAX
        && c3.is_falling()
        && body_ratio(c3) > STAR_OUTER_BODY_MIN
        && c3.close < (c1.open + c1.close) / 2.0
}

fn is_three_rising(c1: &PriceBar, c2: &PriceBar, c3: &PriceBar) -> bool {
    c1.is_rising() && c2.is_rising() && c3.is_rising() && c1.close < c2.close && c2.close < c3.close
}

fn is_three_falling(c1: &PriceBar, c2: &PriceBar, c3: &PriceBar) -> bool {
    c1.is_falling() && c2.is_falling() && c3.is_falling() && c1.close > c2.close && c2.close > c3.close
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(d: u32, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar::new(NaiveDate::from_ymd_opt(2024, 5, d).unwrap(), open, high, low, close, 1_000)
    }

    fn kinds(bars: &[PriceBar]) -> Vec<SignalKind> {
        let refs: Vec<&PriceBar> = bars.iter().collect();
        detect_patterns(&refs).into_iter().map(|s| s.kind).collect()
    }

    #[test]
    fn bullish_engulfing_fires() {
        let bars = [
            bar(1, 11.0, 11.5, 10.5, 11.2),
            bar(2, 12.0, 12.2, 9.9, 10.0),
            bar(3, 9.0, 13.1, 8.9, 13.0),
        ];
        let k = kinds(&bars);
        assert!(k.contains(&SignalKind::BullishEngulfing));
        assert!(!k.contains(&SignalKind::BearishEngulfing));
    }

    #[test]
    fn bearish_engulfing_fires() {
        let bars = [bar(1, 10.0, 12.2, 9.9, 12.0), bar(2, 13.0, 13.1, 8.9, 9.0)];
        assert!(kinds(&bars).contains(&SignalKind::BearishEngulfing));
    }

    #[test]
    fn hammer_and_shooting_star() {
        // body 1, lower shadow 3, upper shadow 0.5
        assert_eq!(kinds(&[bar(1, 100.0, 101.5, 97.0, 101.0)]), vec![SignalKind::Hammer]);
        // body 1, upper shadow 3, lower shadow 0.5
        assert_eq!(kinds(&[bar(1, 101.0, 104.0, 99.5, 100.0)]), vec![SignalKind::ShootingStar]);
    }

    #[test]
    fn doji_is_neither_hammer_nor_star() {
        assert!(kinds(&[bar(1, 100.0, 103.0, 97.0, 100.0)]).is_empty());
    }

    #[test]
    fn morning_star() {
        let bars = [
            bar(1, 100.0, 100.5, 95.5, 96.0),  // -4%
            bar(2, 95.0, 95.6, 94.4, 95.2),    // ~0.2% body
            bar(3, 95.5, 99.6, 95.3, 99.5),    // +4.2%, above midpoint 98
        ];
        assert!(kinds(&bars).contains(&SignalKind::MorningStar));
    }

    #[test]
    fn evening_star() {
        let bars = [
            bar(1, 96.0, 100.5, 95.5, 100.0),
            bar(2, 101.0, 101.6, 100.4, 101.2),
            bar(3, 100.5, 100.7, 96.4, 96.5),
        ];
        assert!(kinds(&bars).contains(&SignalKind::EveningStar));
    }

    #[test]
    fn bullish_cannon() {
        let bars = [
            bar(1, 100.0, 103.5, 99.5, 103.0),
            bar(2, 102.5, 102.8, 100.8, 101.0),
            bar(3, 101.0, 104.5, 100.9, 104.0),
        ];
        assert!(kinds(&bars).contains(&SignalKind::BullishCannon));
        assert!(!kinds(&bars).contains(&SignalKind::BearishCannon));
    }

    #[test]
    fn bearish_cannon() {
        let bars = [
            bar(1, 104.0, 104.5, 100.5, 101.0),
            bar(2, 101.5, 103.2, 101.3, 103.0),
            bar(3, 103.0, 103.1, 99.5, 100.0),
        ];
        assert!(kinds(&bars).contains(&SignalKind::BearishCannon));
        assert!(!kinds(&bars).contains(&SignalKind::BullishCannon));
    }

    #[test]
    fn three_rising_and_falling() {
        let up = [
            bar(1, 10.0, 10.6, 9.9, 10.5),
            bar(2, 10.5, 11.1, 10.4, 11.0),
            bar(3, 11.0, 11.6, 10.9, 11.5),
        ];
        assert!(kinds(&up).contains(&SignalKind::ThreeRisingBars));

        let down = [
            bar(1, 11.5, 11.6, 10.9, 11.0),
            bar(2, 11.0, 11.1, 10.4, 10.5),
            bar(3, 10.5, 10.6, 9.9, 10.0),
        ];
        assert!(kinds(&down).contains(&SignalKind::ThreeFallingBars));
    }

    #[test]
    fn empty_input() {
        assert!(detect_patterns(&[]).is_empty());
    }
}
