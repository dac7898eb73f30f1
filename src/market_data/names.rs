// =============================================================================
// Company name lookup
// =============================================================================
//
// Order: built-in table → local registry file → quote-page <title> scrape →
// echo the code. Never fails; the source is reported so the caller only
// caches answers that came from a real lookup.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::runtime_config::DashboardConfig;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) twstock-dashboard/0.1";

/// Frequently viewed listings, answered without touching disk or network.
const BUILTIN_NAMES: &[(&str, &str)] = &[
    ("0050", "元大台灣50"),
    ("0056", "元大高股息"),
    ("2303", "聯電"),
    ("2308", "台達電"),
    ("2317", "鴻海"),
    ("2330", "台積電"),
    ("2412", "中華電"),
    ("2454", "聯發科"),
    ("2603", "長榮"),
    ("2881", "富邦金"),
    ("2882", "國泰金"),
    ("2891", "中信金"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameSource {
    Builtin,
    Registry,
    QuotePage,
    /// Nothing answered; the name is the code itself.
    Echo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedName {
    pub code: String,
    pub name: String,
    pub source: NameSource,
}

impl ResolvedName {
    /// Whether a real source produced the name (worth caching).
    pub fn is_authoritative(&self) -> bool {
        self.source != NameSource::Echo
    }
}

pub struct NameResolver {
    quote_page_base: String,
    registry: HashMap<String, String>,
    client: reqwest::Client,
}

impl NameResolver {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .context("failed to build quote page HTTP client")?;

        let registry = match &config.name_registry_path {
            Some(path) => load_registry(path).unwrap_or_else(|e| {
                warn!(error = %e, "name registry unavailable, continuing without it");
                HashMap::new()
            }),
            None => HashMap::new(),
        };

        Ok(Self {
            quote_page_base: config.quote_page_base.trim_end_matches('/').to_string(),
            registry,
            client,
        })
    }

    pub fn registry_len(&self) -> usize {
        self.registry.len()
    }

    /// Built-in table and registry only; no I/O.
    pub fn lookup_local(&self, code: &str) -> Option<ResolvedName> {
        let base = base_code(code);
        if let Some((_, name)) = BUILTIN_NAMES.iter().find(|(c, _)| *c == base) {
            return Some(ResolvedName {
                code: code.to_string(),
                name: (*name).to_string(),
                source: NameSource::Builtin,
            });
        }
        self.registry.get(base).map(|name| ResolvedName {
            code: code.to_string(),
            name: name.clone(),
            source: NameSource::Registry,
        })
    }

    #[instrument(skip(self), name = "names::resolve")]
    pub async fn resolve(&self, code: &str) -> ResolvedName {
        if let Some(found) = self.lookup_local(code) {
            return found;
        }

        match self.scrape_title(base_code(code)).await {
            Ok(Some(name)) => {
                debug!(code, name = %name, "name scraped from quote page");
                return ResolvedName {
                    code: code.to_string(),
                    name,
                    source: NameSource::QuotePage,
                };
            }
            Ok(None) => debug!(code, "quote page had no usable title"),
            Err(e) => warn!(code, error = %e, "quote page lookup failed"),
        }

        ResolvedName {
            code: code.to_string(),
            name: code.to_string(),
            source: NameSource::Echo,
        }
    }

    /// GET {quote_page_base}/quote/{code} and read the name from `<title>`.
    async fn scrape_title(&self, code: &str) -> Result<Option<String>> {
        let url = format!("{}/quote/{}", self.quote_page_base, code);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("quote page returned {}", resp.status());
        }

        let html = resp.text().await.context("failed to read quote page body")?;
        Ok(title_name(&html))
    }
}

impl std::fmt::Debug for NameResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NameResolver")
            .field("quote_page_base", &self.quote_page_base)
            .field("registry_entries", &self.registry.len())
            .finish()
    }
}

/// "2330.TW" → "2330".
fn base_code(code: &str) -> &str {
    code.split('.').next().unwrap_or(code)
}

fn load_registry(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read name registry {}", path.display()))?;
    let registry: HashMap<String, String> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse name registry {}", path.display()))?;
    debug!(path = %path.display(), entries = registry.len(), "name registry loaded");
    Ok(registry)
}

/// Titles look like "台積電(2330) 走勢圖 - Yahoo股市"; the name is everything
/// before the first opening parenthesis (ASCII or full-width).
fn title_name(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let start = open + lower[open..].find('>')? + 1;
    let end = start + lower[start..].find("</title>")?;
    let title = &html[start..end];

    let name = title.split(['(', '（']).next()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}
