pub mod cache;
pub mod names;
pub mod price_series;
pub mod yahoo;

pub use cache::{CacheKey, TtlCache};
pub use names::{NameResolver, ResolvedName};
pub use price_series::{PriceBar, PriceSeries};
pub use yahoo::{PriceFetch, YahooClient};

use crate::error::DashboardError;

/// Trim and upper-case a user-entered ticker. Only ASCII alphanumerics, `.`
/// and `-` are accepted.
pub fn normalize_code(raw: &str) -> Result<String, DashboardError> {
    let code = raw.trim().to_ascii_uppercase();
    let valid = !code.is_empty()
        && !code.starts_with('.')
        && code.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if valid {
        Ok(code)
    } else {
        Err(DashboardError::InvalidTicker(raw.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_accepts_common_forms() {
        assert_eq!(normalize_code(" 2330 ").unwrap(), "2330");
        assert_eq!(normalize_code("6488.two").unwrap(), "6488.TWO");
        assert_eq!(normalize_code("00632r").unwrap(), "00632R");
    }

    #[test]
    fn normalize_rejects_garbage() {
        assert!(matches!(normalize_code("   "), Err(DashboardError::InvalidTicker(_))));
        assert!(normalize_code("23 30").is_err());
        assert!(normalize_code("../etc").is_err());
        assert!(normalize_code(".TW").is_err());
    }
}
