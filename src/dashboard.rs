// =============================================================================
// Dashboard pipeline
// =============================================================================
//
//   code → PriceSeriesProvider → IndicatorEngine → {SignalAnalyzer,
//          FibonacciCalculator, ChartRenderer} → StockView
//
// Fetch and name lookups go through the TTL caches. Everything after the
// fetch is pure; render and Fibonacci failures are folded into the view as
// messages so one bad panel never hides the rest.
// =============================================================================

use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::app_state::AppState;
use crate::chart::{ChartFigure, ChartRenderer, ChartRequest};
use crate::error::DashboardError;
use crate::fibonacci::{FibonacciCalculator, FibonacciTable};
use crate::indicators::rsi::rsi_zone;
use crate::indicators::{IndicatorEngine, IndicatorRow, IndicatorStages};
use crate::market_data::{normalize_code, CacheKey, PriceSeries, ResolvedName};
use crate::runtime_config::DisplayPreferences;
use crate::signals::{AnalyzerOptions, SignalAnalyzer, SignalStatement};
use crate::types::FibonacciRatioSet;

const PRICE_OPERATION: &str = "price_series";
const NAME_OPERATION: &str = "company_name";

/// Per-request settings: saved preferences with query overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub display: DisplayPreferences,
    pub stages: IndicatorStages,
    pub fibonacci_ratios: FibonacciRatioSet,
    pub fibonacci_window: usize,
}

/// Output of the pure part of the pipeline.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub rows: Vec<IndicatorRow>,
    pub signals: Vec<SignalStatement>,
    pub fibonacci: Result<FibonacciTable, DashboardError>,
    pub chart: Result<ChartFigure, DashboardError>,
}

/// Everything the dashboard shows for one ticker.
#[derive(Debug, Clone, Serialize)]
pub struct StockView {
    pub request_id: String,
    pub code: String,
    pub symbol: String,
    pub name: String,
    pub bars: usize,
    pub latest: Option<IndicatorRow>,
    /// "OVERBOUGHT" / "OVERSOLD" / "NEUTRAL" for the latest RSI, if defined.
    pub rsi_zone: Option<&'static str>,
    pub signals: Vec<SignalStatement>,
    pub fibonacci: Option<FibonacciTable>,
    pub fibonacci_error: Option<String>,
    pub chart: Option<ChartFigure>,
    pub chart_error: Option<String>,
}

pub struct Dashboard;

impl Dashboard {
    /// Saved preferences from the config, before any query overrides.
    pub fn default_options(state: &AppState) -> ViewOptions {
        let config = state.config.read();
        ViewOptions {
            display: config.display.clone(),
            stages: config.stages,
            fibonacci_ratios: config.fibonacci_ratios,
            fibonacci_window: config.fibonacci_window,
        }
    }

    // -------------------------------------------------------------------------
    // Cached collaborators
    // -------------------------------------------------------------------------

    pub fn price_key(code: &str) -> CacheKey {
        CacheKey::new(PRICE_OPERATION, code)
    }

    pub fn name_key(code: &str) -> CacheKey {
        CacheKey::new(NAME_OPERATION, code)
    }

    /// Price history for `code`, from cache when fresh. Throttling and
    /// transport failures are not cached so the next request retries.
    pub async fn load_series(
        state: &AppState,
        code: &str,
    ) -> Result<(PriceSeries, String), DashboardError> {
        let key = Self::price_key(code);
        let fetch = match state.price_cache.get(&key) {
            Some(hit) => hit,
            None => {
                let fetch = state.prices.fetch(code).await;
                if fetch.failure.is_none() {
                    state.price_cache.insert(key, fetch.clone());
                } else {
                    debug!(code, "transient failure, result not cached");
                }
                fetch
            }
        };

        fetch.into_result(code).map_err(|e| {
            warn!(code, error = %e, "no usable price history");
            state.push_error(&e);
            e
        })
    }

    /// Display name for `code`; only real answers are cached.
    pub async fn resolve_name(state: &AppState, code: &str) -> ResolvedName {
        let key = Self::name_key(code);
        if let Some(hit) = state.name_cache.get(&key) {
            return hit;
        }
        let resolved = state.names.resolve(code).await;
        if resolved.is_authoritative() {
            state.name_cache.insert(key, resolved.clone());
        }
        resolved
    }

    // -------------------------------------------------------------------------
    // Pure pipeline
    // -------------------------------------------------------------------------

    pub fn analyze(series: &PriceSeries, title: &str, options: &ViewOptions) -> Analysis {
        let rows = IndicatorEngine::new(options.stages).compute(series);

        let analyzer = SignalAnalyzer::new(AnalyzerOptions {
            candlestick_patterns: options.display.candlestick_patterns,
        });
        let signals = analyzer.analyze(&rows);

        let fibonacci = FibonacciCalculator::new(options.fibonacci_window, options.fibonacci_ratios)
            .calculate(series);

        let request = ChartRequest::from_preferences(&rows, &options.display);
        let chart = ChartRenderer.render(title, &rows, &request);

        Analysis {
            rows,
            signals,
            fibonacci,
            chart,
        }
    }

    // -------------------------------------------------------------------------
    // Full view
    // -------------------------------------------------------------------------

    /// Run the whole chain for a user-entered ticker inside a request span.
    pub async fn build_view(
        state: &AppState,
        raw_code: &str,
        options: &ViewOptions,
    ) -> Result<StockView, DashboardError> {
        let code = normalize_code(raw_code)?;
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!("dashboard", request_id = %request_id, code = %code);

        async {
            let (series, symbol) = Self::load_series(state, &code).await?;
            let name = Self::resolve_name(state, &code).await;

            let title = format!("{} {}", symbol, name.name);
            let analysis = Self::analyze(&series, &title, options);

            let (fibonacci, fibonacci_error) = split(analysis.fibonacci);
            let (chart, chart_error) = split(analysis.chart);
            if let Some(msg) = &chart_error {
                warn!(error = %msg, "chart not rendered");
                state.push_error_with_code(msg.clone(), Some("render_error".into()));
            }

            let latest = analysis.rows.last().cloned();
            let zone = latest.as_ref().and_then(|r| r.rsi).map(rsi_zone);

            info!(
                symbol = %symbol,
                bars = series.len(),
                signals = analysis.signals.len(),
                rsi_zone = zone.unwrap_or("-"),
                "view built"
            );

            Ok::<_, DashboardError>(StockView {
                request_id: request_id.clone(),
                code: code.clone(),
                symbol,
                name: name.name,
                bars: series.len(),
                latest,
                rsi_zone: zone,
                signals: analysis.signals,
                fibonacci,
                fibonacci_error,
                chart,
                chart_error,
            })
        }
        .instrument(span)
        .await
    }
}

fn split<T>(result: Result<T, DashboardError>) -> (Option<T>, Option<String>) {
    match result {
        Ok(v) => (Some(v), None),
        Err(e) => (None, Some(e.to_string())),
    }
}
