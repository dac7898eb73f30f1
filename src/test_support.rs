// =============================================================================
// Fake upstream for tests
// =============================================================================
//
// A local axum server imitating the chart API and the quote pages:
//   2330.TW   → FAKE_BARS daily bars
//   6488.TWO  → FAKE_BARS daily bars (6488.TW is 404)
//   9999.*    → 429
//   anything else → 404 with the upstream's "Not Found" envelope
// =============================================================================

use axum::{
    extract::Path,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};

pub const FAKE_BARS: usize = 90;

/// 2024-01-02 00:00 UTC.
const FIRST_TIMESTAMP: i64 = 1_704_153_600;
const DAY: i64 = 86_400;

pub struct FakeUpstream {
    pub base_url: String,
}

impl FakeUpstream {
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/v8/finance/chart/:symbol", get(chart))
            .route("/quote/:code", get(quote_page));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake upstream");
        let addr = listener.local_addr().expect("fake upstream addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            base_url: format!("http://{addr}"),
        }
    }
}

async fn chart(Path(symbol): Path<String>) -> impl IntoResponse {
    match symbol.as_str() {
        "2330.TW" => Json(chart_json(600.0)).into_response(),
        "6488.TWO" => Json(chart_json(400.0)).into_response(),
        s if s.starts_with("9999") => StatusCode::TOO_MANY_REQUESTS.into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "chart": {
                    "result": null,
                    "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                }
            })),
        )
            .into_response(),
    }
}

async fn quote_page(Path(code): Path<String>) -> impl IntoResponse {
    match code.as_str() {
        "6488" => Html("<html><head><title>環球晶(6488) 走勢圖 - Yahoo股市</title></head></html>")
            .into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A gently oscillating up-trend so every indicator has defined values.
pub fn chart_json(base: f64) -> serde_json::Value {
    let mut timestamps = Vec::with_capacity(FAKE_BARS);
    let (mut open, mut high, mut low, mut close, mut volume) =
        (Vec::new(), Vec::new(), Vec::new(), Vec::new(), Vec::new());

    for i in 0..FAKE_BARS {
        let t = i as f64;
        let c = base + t * 0.8 + (t / 3.0).sin() * 6.0;
        let o = c - (t / 2.0).cos() * 2.0;
        timestamps.push(FIRST_TIMESTAMP + i as i64 * DAY);
        open.push(o);
        close.push(c);
        high.push(o.max(c) + 1.5);
        low.push(o.min(c) - 1.5);
        volume.push(10_000_000 + (i as u64 % 7) * 1_000_000);
    }

    serde_json::json!({
        "chart": {
            "result": [{
                "meta": { "gmtoffset": 28800 },
                "timestamp": timestamps,
                "indicators": { "quote": [{
                    "open": open, "high": high, "low": low, "close": close, "volume": volume
                }]}
            }],
            "error": null
        }
    })
}
