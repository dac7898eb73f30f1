// =============================================================================
// Shared types used across the dashboard
// =============================================================================

use serde::{Deserialize, Serialize};

/// Display classification of a signal statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalCategory {
    Bullish,
    Bearish,
    Neutral,
}

impl std::fmt::Display for SignalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "bullish"),
            Self::Bearish => write!(f, "bearish"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Which set of retracement ratios the Fibonacci table uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FibonacciRatioSet {
    /// 0.0, 0.382, 0.5, 0.618, 1.0
    Classic,
    /// 0.191, 0.382, 0.5, 0.618, 0.809
    Extended,
}

impl Default for FibonacciRatioSet {
    fn default() -> Self {
        Self::Classic
    }
}

impl FibonacciRatioSet {
    pub fn ratios(self) -> [f64; 5] {
        match self {
            Self::Classic => [0.0, 0.382, 0.5, 0.618, 1.0],
            Self::Extended => [0.191, 0.382, 0.5, 0.618, 0.809],
        }
    }

    /// Parse a query-string value; unknown values yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Some(Self::Classic),
            "extended" => Some(Self::Extended),
            _ => None,
        }
    }
}

impl std::fmt::Display for FibonacciRatioSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Classic => write!(f, "classic"),
            Self::Extended => write!(f, "extended"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_set_parse_is_case_insensitive() {
        assert_eq!(FibonacciRatioSet::parse("Extended"), Some(FibonacciRatioSet::Extended));
        assert_eq!(FibonacciRatioSet::parse(" classic "), Some(FibonacciRatioSet::Classic));
        assert_eq!(FibonacciRatioSet::parse("golden"), None);
    }

    #[test]
    fn category_serialises_lowercase() {
        let json = serde_json::to_string(&SignalCategory::Bearish).unwrap();
        assert_eq!(json, "\"bearish\"");
    }
}
