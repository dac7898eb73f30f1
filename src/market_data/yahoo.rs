// =============================================================================
// Price history client — Yahoo chart API with listing-suffix fallback
// =============================================================================
//
// A bare TWSE/TPEx code ("2330") is tried with each configured suffix in
// order (".TW", then ".TWO"), sleeping briefly between attempts so the
// upstream is not hit in a burst. The first candidate that returns rows wins.
// `fetch` never fails: exhaustion yields an empty series, with the last
// upstream error kept so callers can tell "no data" from "retry later".
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::DateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::price_series::{PriceBar, PriceSeries};
use crate::error::DashboardError;
use crate::runtime_config::DashboardConfig;

/// Browser-like agent; the chart endpoint throttles anonymous clients hard.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) twstock-dashboard/0.1";

/// Result of resolving a ticker code to a price history.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceFetch {
    pub series: PriceSeries,
    /// Symbol that produced the data, e.g. "2330.TW"; empty when none did.
    pub resolved_symbol: String,
    /// Last upstream error seen while every candidate came back empty.
    pub failure: Option<DashboardError>,
}

impl PriceFetch {
    pub fn empty(failure: Option<DashboardError>) -> Self {
        Self {
            series: PriceSeries::empty(),
            resolved_symbol: String::new(),
            failure,
        }
    }

    /// Convert to the error taxonomy: throttling and transport failures stay
    /// retryable, anything else without rows is `NoDataFound`.
    pub fn into_result(self, code: &str) -> Result<(PriceSeries, String), DashboardError> {
        if !self.series.is_empty() {
            return Ok((self.series, self.resolved_symbol));
        }
        match self.failure {
            Some(e) if e.is_retryable() => Err(e),
            _ => Err(DashboardError::NoDataFound {
                code: code.to_string(),
            }),
        }
    }
}

/// Chart API client.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    range: String,
    suffixes: Vec<String>,
    retry_delay: Duration,
    client: reqwest::Client,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .context("failed to build chart API HTTP client")?;

        debug!(base_url = %config.chart_api_base, "YahooClient initialised");

        Ok(Self {
            base_url: config.chart_api_base.trim_end_matches('/').to_string(),
            range: config.history_range.clone(),
            suffixes: config.market_suffixes.clone(),
            retry_delay: config.suffix_retry_delay(),
            client,
        })
    }

    /// Symbols to try for `code`, in order. A code that already carries a
    /// suffix is used verbatim.
    pub fn candidates(&self, code: &str) -> Vec<String> {
        if code.contains('.') || self.suffixes.is_empty() {
            return vec![code.to_string()];
        }
        self.suffixes.iter().map(|s| format!("{code}{s}")).collect()
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Resolve `code` to a daily price history. Never fails.
    #[instrument(skip(self), name = "yahoo::fetch")]
    pub async fn fetch(&self, code: &str) -> PriceFetch {
        let mut failure = None;

        for (attempt, symbol) in self.candidates(code).iter().enumerate() {
            if attempt > 0 && !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay).await;
            }
            match self.fetch_symbol(symbol).await {
                Ok(series) if !series.is_empty() => {
                    info!(code, symbol = %symbol, bars = series.len(), "price history resolved");
                    return PriceFetch {
                        series,
                        resolved_symbol: symbol.clone(),
                        failure: None,
                    };
                }
                Ok(_) => debug!(symbol = %symbol, "no rows for candidate"),
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "price fetch failed");
                    failure = Some(e);
                }
            }
        }

        info!(code, "no candidate symbol returned price data");
        PriceFetch::empty(failure)
    }

    /// GET /v8/finance/chart/{symbol}?range=..&interval=1d
    ///
    /// 404 and an empty result are "no data" (`Ok` with an empty series); 429
    /// is `RateLimited`; everything else unexpected is `TransientFetch`.
    #[instrument(skip(self), name = "yahoo::fetch_symbol")]
    pub async fn fetch_symbol(&self, symbol: &str) -> Result<PriceSeries, DashboardError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let transient = |reason: String| DashboardError::TransientFetch {
            symbol: symbol.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(&url)
            .query(&[("range", self.range.as_str()), ("interval", "1d")])
            .send()
            .await
            .map_err(|e| transient(format!("request failed: {e}")))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DashboardError::RateLimited {
                symbol: symbol.to_string(),
            });
        }
        if status == StatusCode::NOT_FOUND {
            debug!(symbol, "chart endpoint returned 404");
            return Ok(PriceSeries::empty());
        }
        if !status.is_success() {
            return Err(transient(format!("chart endpoint returned {status}")));
        }

        let body: ChartEnvelope = resp
            .json()
            .await
            .map_err(|e| transient(format!("failed to parse chart response: {e}")))?;

        let series = parse_chart(body);
        debug!(symbol, bars = series.len(), "chart parsed");
        Ok(series)
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .field("range", &self.range)
            .field("suffixes", &self.suffixes)
            .finish()
    }
}

// =============================================================================
// Wire format
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds (Taipei: 28800).
    #[serde(default, rename = "gmtoffset")]
    gmt_offset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Zip the column arrays into bars. Rows with a missing price are skipped;
/// a missing volume counts as zero.
fn parse_chart(envelope: ChartEnvelope) -> PriceSeries {
    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return PriceSeries::empty();
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return PriceSeries::empty();
    };
    let offset = result.meta.gmt_offset;

    let at = |col: &[Option<f64>], i: usize| col.get(i).copied().flatten();

    let bars = result.timestamp.iter().enumerate().filter_map(|(i, &ts)| {
        let date = DateTime::from_timestamp(ts.checked_add(offset)?, 0)?.date_naive();
        let volume = at(&quote.volume, i).unwrap_or(0.0).max(0.0) as u64;
        Some(PriceBar::new(
            date,
            at(&quote.open, i)?,
            at(&quote.high, i)?,
            at(&quote.low, i)?,
            at(&quote.close, i)?,
            volume,
        ))
    });

    PriceSeries::new(bars)
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeUpstream;
    use chrono::NaiveDate;

    fn config_for(upstream: &FakeUpstream) -> DashboardConfig {
        DashboardConfig {
            chart_api_base: upstream.base_url.clone(),
            quote_page_base: upstream.base_url.clone(),
            suffix_retry_delay_ms: 0,
            ..DashboardConfig::default()
        }
    }

    #[test]
    fn candidates_follow_suffix_order() {
        let client = YahooClient::new(&DashboardConfig::default()).unwrap();
        assert_eq!(client.candidates("2330"), vec!["2330.TW", "2330.TWO"]);
        assert_eq!(client.candidates("6488.TWO"), vec!["6488.TWO"]);
    }

    #[test]
    fn parse_skips_null_rows_and_applies_offset() {
        let json = serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "2330.TW", "gmtoffset": 28800 },
                    "timestamp": [1704153600, 1704240000, 1704326400],
                    "indicators": { "quote": [{
                        "open":   [590.0, null, 592.0],
                        "high":   [593.0, 594.0, 595.0],
                        "low":    [589.0, 588.0, 590.0],
                        "close":  [592.0, 590.0, 594.0],
                        "volume": [25000000, 1000, null]
                    }]}
                }],
                "error": null
            }
        });
        let envelope: ChartEnvelope = serde_json::from_value(json).unwrap();
        let series = parse_chart(envelope);
        assert_eq!(series.len(), 2);
        // 2024-01-02 00:00 UTC + 8h is still 2024-01-02 in Taipei.
        assert_eq!(series.bars()[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(series.bars()[0].volume, 25_000_000);
        assert_eq!(series.bars()[1].volume, 0);
    }

    #[test]
    fn parse_skips_timestamps_that_overflow_with_offset() {
        let json = serde_json::json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "2330.TW", "gmtoffset": 28800 },
                    "timestamp": [i64::MAX, 1704153600],
                    "indicators": { "quote": [{
                        "open":   [590.0, 591.0],
                        "high":   [593.0, 594.0],
                        "low":    [589.0, 588.0],
                        "close":  [592.0, 590.0],
                        "volume": [1000, 2000]
                    }]}
                }],
                "error": null
            }
        });
        let envelope: ChartEnvelope = serde_json::from_value(json).unwrap();
        let series = parse_chart(envelope);
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn parse_null_result() {
        let json = serde_json::json!({ "chart": { "result": null, "error": { "code": "Not Found" } } });
        let envelope: ChartEnvelope = serde_json::from_value(json).unwrap();
        assert!(parse_chart(envelope).is_empty());
    }

    #[tokio::test]
    async fn listed_code_resolves_on_first_suffix() {
        let upstream = FakeUpstream::start().await;
        let client = YahooClient::new(&config_for(&upstream)).unwrap();
        let fetch = client.fetch("2330").await;
        assert_eq!(fetch.resolved_symbol, "2330.TW");
        assert_eq!(fetch.series.len(), crate::test_support::FAKE_BARS);
        assert!(fetch.failure.is_none());
    }

    #[tokio::test]
    async fn otc_code_falls_back_to_second_suffix() {
        let upstream = FakeUpstream::start().await;
        let client = YahooClient::new(&config_for(&upstream)).unwrap();
        let fetch = client.fetch("6488").await;
        assert_eq!(fetch.resolved_symbol, "6488.TWO");
        assert!(!fetch.series.is_empty());
    }

    #[tokio::test]
    async fn unknown_code_is_empty_and_no_data() {
        let upstream = FakeUpstream::start().await;
        let client = YahooClient::new(&config_for(&upstream)).unwrap();
        let fetch = client.fetch("0000").await;
        assert!(fetch.series.is_empty());
        assert_eq!(fetch.resolved_symbol, "");
        assert!(matches!(
            fetch.into_result("0000"),
            Err(DashboardError::NoDataFound { .. })
        ));
    }

    #[tokio::test]
    async fn throttled_upstream_is_retryable() {
        let upstream = FakeUpstream::start().await;
        let client = YahooClient::new(&config_for(&upstream)).unwrap();
        let fetch = client.fetch("9999").await;
        assert!(fetch.series.is_empty());
        assert!(matches!(
            fetch.into_result("9999"),
            Err(DashboardError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_upstream_degrades_to_empty() {
        let cfg = DashboardConfig {
            chart_api_base: "http://127.0.0.1:1".to_string(),
            suffix_retry_delay_ms: 0,
            request_timeout_secs: 2,
            ..DashboardConfig::default()
        };
        let client = YahooClient::new(&cfg).unwrap();
        let fetch = client.fetch("2330").await;
        assert!(fetch.series.is_empty());
        assert!(matches!(fetch.failure, Some(DashboardError::TransientFetch { .. })));
    }
}
