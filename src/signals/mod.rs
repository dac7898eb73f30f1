// =============================================================================
// Signals Module
// =============================================================================
//
// Rule-based, human-readable statements derived from the last few enriched
// rows:
// - Trend / crossover / threshold rules over indicator columns
// - Candlestick shape heuristics over the last one to three bars

pub mod analyzer;
pub mod candlestick;

use serde::{Deserialize, Serialize};

use crate::types::SignalCategory;

pub use analyzer::{AnalyzerOptions, SignalAnalyzer};

/// Every statement the analyzer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    BullishAlignment,
    BearishAlignment,
    MaGoldenCross,
    MaDeathCross,
    KdGoldenCross,
    KdDeathCross,
    MacdTurnedPositive,
    MacdTurnedNegative,
    RsiOverbought,
    RsiOversold,
    BollingerBreakout,
    BollingerBreakdown,
    StrongBullishBar,
    StrongBearishBar,
    IndecisionBar,
    BullishCannon,
    BearishCannon,
    BullishEngulfing,
    BearishEngulfing,
    Hammer,
    ShootingStar,
    MorningStar,
    EveningStar,
    ThreeRisingBars,
    ThreeFallingBars,
    NoClearSignal,
    InsufficientData,
}

impl SignalKind {
    pub fn category(self) -> SignalCategory {
        use SignalKind::*;
        match self {
            BullishAlignment | MaGoldenCross | KdGoldenCross | MacdTurnedPositive | RsiOversold
            | BollingerBreakout | StrongBullishBar | BullishCannon | BullishEngulfing | Hammer
            | MorningStar | ThreeRisingBars => SignalCategory::Bullish,
            BearishAlignment | MaDeathCross | KdDeathCross | MacdTurnedNegative | RsiOverbought
            | BollingerBreakdown | StrongBearishBar | BearishCannon | BearishEngulfing
            | ShootingStar | EveningStar | ThreeFallingBars => SignalCategory::Bearish,
            IndecisionBar | NoClearSignal | InsufficientData => SignalCategory::Neutral,
        }
    }
}

/// One line of the signal panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalStatement {
    pub category: SignalCategory,
    pub kind: SignalKind,
    pub text: String,
}

impl SignalStatement {
    pub fn new(kind: SignalKind, text: impl Into<String>) -> Self {
        Self {
            category: kind.category(),
            kind,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_follows_kind() {
        assert_eq!(SignalStatement::new(SignalKind::Hammer, "h").category, SignalCategory::Bullish);
        assert_eq!(SignalStatement::new(SignalKind::RsiOverbought, "r").category, SignalCategory::Bearish);
        assert_eq!(SignalStatement::new(SignalKind::IndecisionBar, "d").category, SignalCategory::Neutral);
    }

    #[test]
    fn statement_serialises_kind_snake_case() {
        let json = serde_json::to_value(SignalStatement::new(SignalKind::MaGoldenCross, "x")).unwrap();
        assert_eq!(json["kind"], "ma_golden_cross");
        assert_eq!(json["category"], "bullish");
    }
}
