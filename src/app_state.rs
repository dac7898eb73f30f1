// =============================================================================
// Central Application State — TW stock dashboard
// =============================================================================
//
// Shared by every request handler via `Arc<AppState>`. The upstream clients
// are stateless; the only shared mutable resources are the configuration,
// the two TTL caches and the recent-error ring.
//
// Thread safety:
//   - Atomic counter for lock-free version tracking.
//   - parking_lot::RwLock for the config and the error ring.
//   - TtlCache manages its own interior locking.
// =============================================================================

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::error::DashboardError;
use crate::market_data::{NameResolver, PriceFetch, ResolvedName, TtlCache, YahooClient};
use crate::runtime_config::DashboardConfig;

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the health payload.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code (see `DashboardError::code`).
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Incremented whenever preferences change or a cache is cleared.
    pub state_version: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub config: Arc<RwLock<DashboardConfig>>,
    /// Where preference changes are persisted.
    pub config_path: PathBuf,

    // ── Upstream collaborators ──────────────────────────────────────────
    pub prices: YahooClient,
    pub names: NameResolver,

    // ── Caches ──────────────────────────────────────────────────────────
    pub price_cache: TtlCache<PriceFetch>,
    pub name_cache: TtlCache<ResolvedName>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct the state from `config`. Fails only if an HTTP client
    /// cannot be built.
    pub fn new(config: DashboardConfig, config_path: impl Into<PathBuf>) -> Result<Self> {
        let prices = YahooClient::new(&config)?;
        let names = NameResolver::new(&config)?;

        Ok(Self {
            state_version: AtomicU64::new(1),
            price_cache: TtlCache::new(config.price_cache_ttl()),
            name_cache: TtlCache::new(config.name_cache_ttl()),
            config: Arc::new(RwLock::new(config)),
            config_path: config_path.into(),
            prices,
            names,
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        })
    }

    // ── Version Management ──────────────────────────────────────────────

    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record a dashboard error. The ring buffer is capped at
    /// [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, err: &DashboardError) {
        self.push_error_with_code(err.to_string(), Some(err.code().to_string()));
    }

    pub fn push_error_with_code(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
