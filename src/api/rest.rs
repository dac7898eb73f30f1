// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`. The dashboard front end is a static
// page; everything it shows comes from here.
//
// Display toggles saved in the config can be overridden per request with
// query parameters: `volume`, `kd`, `macd`, `rsi`, `bollinger`, `patterns`
// (booleans), `ma=5,20` and `fib=classic|extended`.
//
// CORS is configured permissively for development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::app_state::{AppState, ErrorRecord};
use crate::dashboard::{Dashboard, ViewOptions};
use crate::error::DashboardError;
use crate::indicators::moving_average::MA_WINDOWS;
use crate::market_data::normalize_code;
use crate::runtime_config::DisplayPreferences;
use crate::types::FibonacciRatioSet;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        // ── Stock views ─────────────────────────────────────────────
        .route("/api/v1/stocks/:code", get(stock_view))
        .route("/api/v1/stocks/:code/indicators", get(stock_indicators))
        .route("/api/v1/stocks/:code/signals", get(stock_signals))
        .route("/api/v1/stocks/:code/fibonacci", get(stock_fibonacci))
        .route("/api/v1/stocks/:code/chart", get(stock_chart))
        .route("/api/v1/names/:code", get(company_name))
        // ── Preferences & caches ────────────────────────────────────
        .route("/api/v1/preferences", get(get_preferences).post(set_preferences))
        .route("/api/v1/cache/clear", post(clear_cache))
        // ── Middleware & State ───────────────────────────────────────
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Error mapping
// =============================================================================

impl DashboardError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NoDataFound { .. } => StatusCode::NOT_FOUND,
            Self::RateLimited { .. } | Self::TransientFetch { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::InsufficientData { .. } | Self::Render(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidTicker(_) | Self::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for DashboardError {
    fn into_response(self) -> Response {
        let message = if self.is_retryable() {
            format!("{self}. Please try again in a moment.")
        } else {
            self.to_string()
        };
        let body = serde_json::json!({
            "error": self.code(),
            "message": message,
        });
        (self.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Per-request overrides
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ViewQuery {
    #[serde(default)]
    volume: Option<bool>,
    #[serde(default)]
    kd: Option<bool>,
    #[serde(default)]
    macd: Option<bool>,
    #[serde(default)]
    rsi: Option<bool>,
    #[serde(default)]
    bollinger: Option<bool>,
    #[serde(default)]
    patterns: Option<bool>,
    /// Comma-separated subset of 5,10,20,60; empty string hides all MAs.
    #[serde(default)]
    ma: Option<String>,
    #[serde(default)]
    fib: Option<String>,
}

impl ViewQuery {
    fn apply(&self, mut options: ViewOptions) -> Result<ViewOptions, DashboardError> {
        let display = &mut options.display;
        if let Some(v) = self.volume {
            display.show_volume = v;
        }
        if let Some(v) = self.kd {
            display.show_kd = v;
        }
        if let Some(v) = self.macd {
            display.show_macd = v;
        }
        if let Some(v) = self.rsi {
            display.show_rsi = v;
        }
        if let Some(v) = self.bollinger {
            display.show_bollinger = v;
        }
        if let Some(v) = self.patterns {
            display.candlestick_patterns = v;
        }
        if let Some(ma) = &self.ma {
            display.moving_averages = parse_ma_list(ma)?;
        }
        if let Some(fib) = &self.fib {
            options.fibonacci_ratios = FibonacciRatioSet::parse(fib).ok_or_else(|| {
                DashboardError::InvalidQuery(format!("fib must be 'classic' or 'extended', got '{fib}'"))
            })?;
        }
        Ok(options)
    }
}

fn parse_ma_list(raw: &str) -> Result<Vec<usize>, DashboardError> {
    let mut windows = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let window = part
            .parse::<usize>()
            .ok()
            .filter(|w| MA_WINDOWS.contains(w))
            .ok_or_else(|| DashboardError::InvalidQuery(format!("unsupported moving average '{part}'")))?;
        if !windows.contains(&window) {
            windows.push(window);
        }
    }
    windows.sort_unstable();
    Ok(windows)
}

/// Malformed query strings get the same JSON error body as every other 400.
fn query_params<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, DashboardError> {
    query
        .map(|Query(q)| q)
        .map_err(|e| DashboardError::InvalidQuery(e.body_text()))
}

fn view_options(state: &AppState, query: &ViewQuery) -> Result<ViewOptions, DashboardError> {
    query.apply(Dashboard::default_options(state))
}

/// Fetch and analyse `code` for the narrower endpoints.
async fn analysis_for(
    state: &AppState,
    code: &str,
    query: &ViewQuery,
) -> Result<(String, String, crate::dashboard::Analysis), DashboardError> {
    let options = view_options(state, query)?;
    let code = normalize_code(code)?;
    let (series, symbol) = Dashboard::load_series(state, &code).await?;
    let analysis = Dashboard::analyze(&series, &symbol, &options);
    Ok((code, symbol, analysis))
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_secs: u64,
    cached_series: usize,
    cached_names: usize,
    price_ttl_secs: u64,
    name_ttl_secs: u64,
    recent_errors: Vec<ErrorRecord>,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_secs: state.uptime_secs(),
        cached_series: state.price_cache.len(),
        cached_names: state.name_cache.len(),
        price_ttl_secs: state.price_cache.ttl().as_secs(),
        name_ttl_secs: state.name_cache.ttl().as_secs(),
        recent_errors: state.recent_errors.read().clone(),
    };
    Json(resp)
}

// =============================================================================
// Stock views
// =============================================================================

async fn stock_view(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, DashboardError> {
    let query = query_params(query)?;
    let options = view_options(&state, &query)?;
    let view = Dashboard::build_view(&state, &code, &options).await?;
    Ok(Json(view))
}

async fn stock_indicators(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, DashboardError> {
    let query = query_params(query)?;
    let (code, symbol, analysis) = analysis_for(&state, &code, &query).await?;
    Ok(Json(serde_json::json!({
        "code": code,
        "symbol": symbol,
        "rows": analysis.rows,
    })))
}

async fn stock_signals(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, DashboardError> {
    let query = query_params(query)?;
    let (code, symbol, analysis) = analysis_for(&state, &code, &query).await?;
    Ok(Json(serde_json::json!({
        "code": code,
        "symbol": symbol,
        "signals": analysis.signals,
    })))
}

async fn stock_fibonacci(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, DashboardError> {
    let query = query_params(query)?;
    let (code, symbol, analysis) = analysis_for(&state, &code, &query).await?;
    let table = analysis.fibonacci?;
    Ok(Json(serde_json::json!({
        "code": code,
        "symbol": symbol,
        "fibonacci": table,
    })))
}

async fn stock_chart(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<impl IntoResponse, DashboardError> {
    let query = query_params(query)?;
    let (_, _, analysis) = analysis_for(&state, &code, &query).await?;
    let figure = analysis.chart.map_err(|e| {
        warn!(error = %e, "chart not rendered");
        state.push_error(&e);
        e
    })?;
    Ok(Json(figure))
}

async fn company_name(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, DashboardError> {
    let code = normalize_code(&code)?;
    Ok(Json(Dashboard::resolve_name(&state, &code).await))
}

// =============================================================================
// Preferences
// =============================================================================

#[derive(Serialize)]
struct PreferencesResponse {
    display: DisplayPreferences,
    fibonacci_ratios: FibonacciRatioSet,
    changes: Vec<String>,
}

async fn get_preferences(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let config = state.config.read();
    Json(PreferencesResponse {
        display: config.display.clone(),
        fibonacci_ratios: config.fibonacci_ratios,
        changes: Vec::new(),
    })
}

#[derive(Deserialize)]
struct PreferencesUpdate {
    #[serde(default)]
    show_volume: Option<bool>,
    #[serde(default)]
    show_kd: Option<bool>,
    #[serde(default)]
    show_macd: Option<bool>,
    #[serde(default)]
    show_rsi: Option<bool>,
    #[serde(default)]
    show_bollinger: Option<bool>,
    #[serde(default)]
    candlestick_patterns: Option<bool>,
    #[serde(default)]
    moving_averages: Option<Vec<usize>>,
    #[serde(default)]
    fibonacci_ratios: Option<FibonacciRatioSet>,
}

async fn set_preferences(
    State(state): State<Arc<AppState>>,
    Json(update): Json<PreferencesUpdate>,
) -> Result<impl IntoResponse, DashboardError> {
    if let Some(windows) = &update.moving_averages {
        if let Some(bad) = windows.iter().find(|w| !MA_WINDOWS.contains(w)) {
            return Err(DashboardError::InvalidQuery(format!("unsupported moving average '{bad}'")));
        }
    }

    let mut config = state.config.write();
    let mut changes = Vec::new();

    macro_rules! apply_flag {
        ($field:ident) => {
            if let Some(val) = update.$field {
                if config.display.$field != val {
                    changes.push(format!(
                        "{}: {} -> {}",
                        stringify!($field),
                        config.display.$field,
                        val
                    ));
                    config.display.$field = val;
                }
            }
        };
    }

    apply_flag!(show_volume);
    apply_flag!(show_kd);
    apply_flag!(show_macd);
    apply_flag!(show_rsi);
    apply_flag!(show_bollinger);
    apply_flag!(candlestick_patterns);

    if let Some(mut windows) = update.moving_averages {
        windows.sort_unstable();
        windows.dedup();
        if config.display.moving_averages != windows {
            changes.push(format!(
                "moving_averages: {:?} -> {:?}",
                config.display.moving_averages, windows
            ));
            config.display.moving_averages = windows;
        }
    }
    if let Some(ratios) = update.fibonacci_ratios {
        if config.fibonacci_ratios != ratios {
            changes.push(format!("fibonacci_ratios: {} -> {}", config.fibonacci_ratios, ratios));
            config.fibonacci_ratios = ratios;
        }
    }

    // Clone config and drop write lock before saving.
    let config_clone = config.clone();
    drop(config);

    if !changes.is_empty() {
        info!(changes = ?changes, "Display preferences updated");

        if let Err(e) = config_clone.save(&state.config_path) {
            warn!(error = %e, "Failed to save preferences to disk");
        }
        state.increment_version();
    }

    Ok(Json(PreferencesResponse {
        display: config_clone.display,
        fibonacci_ratios: config_clone.fibonacci_ratios,
        changes,
    }))
}

// =============================================================================
// Cache control
// =============================================================================

#[derive(Deserialize)]
struct ClearQuery {
    /// Only drop the entries for this ticker.
    #[serde(default)]
    code: Option<String>,
}

async fn clear_cache(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ClearQuery>, QueryRejection>,
) -> Result<impl IntoResponse, DashboardError> {
    let query = query_params(query)?;
    let (prices, names) = match &query.code {
        Some(raw) => {
            let code = normalize_code(raw)?;
            let prices = state.price_cache.invalidate(&Dashboard::price_key(&code));
            let names = state.name_cache.invalidate(&Dashboard::name_key(&code));
            (usize::from(prices), usize::from(names))
        }
        None => (state.price_cache.clear(), state.name_cache.clear()),
    };
    state.increment_version();
    info!(prices, names, code = ?query.code, "Caches cleared via API");

    Ok(Json(serde_json::json!({
        "prices_cleared": prices,
        "names_cleared": names,
    })))
}
