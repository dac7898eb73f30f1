// =============================================================================
// Dashboard error taxonomy
// =============================================================================
//
// Core computations never fail on well-formed input; these variants describe
// what the boundary (fetch, render, HTTP) converts into user-visible messages.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DashboardError {
    /// Every market-suffix candidate came back without rows.
    #[error("no price data found for '{code}'")]
    NoDataFound { code: String },

    /// Fewer bars than the computation's minimum lookback.
    #[error("insufficient data: need {needed} bars, have {available}")]
    InsufficientData { needed: usize, available: usize },

    /// Upstream answered 429.
    #[error("upstream rate limit hit while fetching '{symbol}', retry later")]
    RateLimited { symbol: String },

    /// Network failure, timeout or an unparseable upstream payload.
    #[error("transient fetch error for '{symbol}': {reason}")]
    TransientFetch { symbol: String, reason: String },

    /// Chart construction failed (bad panel ratios, mismatched overlays).
    #[error("chart rendering failed: {0}")]
    Render(String),

    #[error("invalid ticker code '{0}'")]
    InvalidTicker(String),

    /// A display override in the query string could not be understood.
    #[error("invalid query parameter: {0}")]
    InvalidQuery(String),
}

impl DashboardError {
    /// Whether the user should simply try again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::TransientFetch { .. })
    }

    /// Short machine-readable code for API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoDataFound { .. } => "no_data_found",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::RateLimited { .. } => "rate_limited",
            Self::TransientFetch { .. } => "transient_fetch_error",
            Self::Render(_) => "render_error",
            Self::InvalidTicker(_) => "invalid_ticker",
            Self::InvalidQuery(_) => "invalid_query",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_variants() {
        assert!(DashboardError::RateLimited { symbol: "2330.TW".into() }.is_retryable());
        assert!(DashboardError::TransientFetch {
            symbol: "2330.TW".into(),
            reason: "timeout".into()
        }
        .is_retryable());
        assert!(!DashboardError::NoDataFound { code: "9999".into() }.is_retryable());
        assert!(!DashboardError::Render("x".into()).is_retryable());
    }

    #[test]
    fn messages_are_user_readable() {
        let e = DashboardError::InsufficientData { needed: 2, available: 1 };
        assert_eq!(e.to_string(), "insufficient data: need 2 bars, have 1");
        assert_eq!(e.code(), "insufficient_data");
    }
}
