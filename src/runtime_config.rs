// =============================================================================
// Runtime Configuration — dashboard settings with atomic save
// =============================================================================
//
// Every tunable lives here: upstream endpoints, suffix fallback, cache TTLs,
// indicator stages and the default display toggles. All fields carry
// `#[serde(default)]` so that adding new fields never breaks loading an older
// config file.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::indicators::moving_average::MA_WINDOWS;
use crate::indicators::IndicatorStages;
use crate::types::FibonacciRatioSet;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_chart_api_base() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_quote_page_base() -> String {
    "https://tw.stock.yahoo.com".to_string()
}

fn default_market_suffixes() -> Vec<String> {
    vec![".TW".to_string(), ".TWO".to_string()]
}

fn default_suffix_retry_delay_ms() -> u64 {
    500
}

fn default_history_range() -> String {
    "1y".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_price_cache_ttl_secs() -> u64 {
    3600
}

fn default_name_cache_ttl_secs() -> u64 {
    86_400
}

fn default_fibonacci_window() -> usize {
    crate::fibonacci::DEFAULT_WINDOW
}

fn default_moving_averages() -> Vec<usize> {
    MA_WINDOWS.to_vec()
}

// =============================================================================
// DisplayPreferences
// =============================================================================

/// Default visibility toggles for the chart and signal panels. Requests may
/// override any of them through query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayPreferences {
    #[serde(default = "default_true")]
    pub show_volume: bool,

    #[serde(default = "default_true")]
    pub show_kd: bool,

    #[serde(default = "default_true")]
    pub show_macd: bool,

    #[serde(default = "default_true")]
    pub show_rsi: bool,

    #[serde(default = "default_true")]
    pub show_bollinger: bool,

    /// Moving averages drawn on the price panel (subset of 5/10/20/60).
    #[serde(default = "default_moving_averages")]
    pub moving_averages: Vec<usize>,

    /// Evaluate candlestick-shape rules in the signal panel.
    #[serde(default = "default_true")]
    pub candlestick_patterns: bool,
}

impl Default for DisplayPreferences {
    fn default() -> Self {
        Self {
            show_volume: true,
            show_kd: true,
            show_macd: true,
            show_rsi: true,
            show_bollinger: true,
            moving_averages: default_moving_averages(),
            candlestick_patterns: true,
        }
    }
}

// =============================================================================
// DashboardConfig
// =============================================================================

/// Top-level configuration for the dashboard service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    // --- Server --------------------------------------------------------------
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    // --- Upstream ------------------------------------------------------------

    /// Base URL of the chart (OHLCV history) API.
    #[serde(default = "default_chart_api_base")]
    pub chart_api_base: String,

    /// Base URL of the quote pages scraped for company names.
    #[serde(default = "default_quote_page_base")]
    pub quote_page_base: String,

    /// Listing suffixes tried in order for a bare ticker code.
    #[serde(default = "default_market_suffixes")]
    pub market_suffixes: Vec<String>,

    /// Pause between consecutive suffix attempts (milliseconds).
    #[serde(default = "default_suffix_retry_delay_ms")]
    pub suffix_retry_delay_ms: u64,

    /// History range requested from the chart API, e.g. "6mo", "1y".
    #[serde(default = "default_history_range")]
    pub history_range: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    // --- Caching -------------------------------------------------------------
    #[serde(default = "default_price_cache_ttl_secs")]
    pub price_cache_ttl_secs: u64,

    #[serde(default = "default_name_cache_ttl_secs")]
    pub name_cache_ttl_secs: u64,

    /// Optional JSON file `{ "2330": "台積電", ... }` consulted before the web.
    #[serde(default)]
    pub name_registry_path: Option<String>,

    // --- Analysis ------------------------------------------------------------
    #[serde(default = "default_fibonacci_window")]
    pub fibonacci_window: usize,

    #[serde(default)]
    pub fibonacci_ratios: FibonacciRatioSet,

    #[serde(default)]
    pub stages: IndicatorStages,

    #[serde(default)]
    pub display: DisplayPreferences,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            chart_api_base: default_chart_api_base(),
            quote_page_base: default_quote_page_base(),
            market_suffixes: default_market_suffixes(),
            suffix_retry_delay_ms: default_suffix_retry_delay_ms(),
            history_range: default_history_range(),
            request_timeout_secs: default_request_timeout_secs(),
            price_cache_ttl_secs: default_price_cache_ttl_secs(),
            name_cache_ttl_secs: default_name_cache_ttl_secs(),
            name_registry_path: None,
            fibonacci_window: default_fibonacci_window(),
            fibonacci_ratios: FibonacciRatioSet::Classic,
            stages: IndicatorStages::default(),
            display: DisplayPreferences::default(),
        }
    }
}

impl DashboardConfig {
    pub fn suffix_retry_delay(&self) -> Duration {
        Duration::from_millis(self.suffix_retry_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    pub fn name_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.name_cache_ttl_secs)
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dashboard config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse dashboard config from {}", path.display()))?;

        info!(
            path = %path.display(),
            suffixes = ?config.market_suffixes,
            range = %config.history_range,
            "dashboard config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise dashboard config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "dashboard config saved (atomic)");
        Ok(())
    }
}
