// =============================================================================
// Chart Renderer — declarative multi-panel candlestick figure
// =============================================================================
//
// Panel 0 always carries the candles; every other panel exists only to host
// overlays. The renderer does no drawing: it validates the request against
// the table and emits a JSON figure the front end plots as-is.
//
// Rejected (RenderError):
//   - empty table
//   - no panel ratios, or a zero ratio
//   - an overlay targeting a panel that does not exist
//   - an overlay whose length differs from the table
//   - a panel other than 0 with nothing to draw
// =============================================================================

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::error::DashboardError;
use crate::indicators::IndicatorRow;
use crate::market_data::PriceBar;
use crate::runtime_config::DisplayPreferences;

/// Height ratio of the price panel relative to each indicator panel.
pub const PRICE_PANEL_RATIO: u32 = 3;
pub const INDICATOR_PANEL_RATIO: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySeries {
    pub name: String,
    pub panel: usize,
    pub color: String,
    pub kind: PlotKind,
    pub values: Vec<Option<f64>>,
}

impl OverlaySeries {
    pub fn new(
        name: impl Into<String>,
        panel: usize,
        color: impl Into<String>,
        kind: PlotKind,
        values: Vec<Option<f64>>,
    ) -> Self {
        Self {
            name: name.into(),
            panel,
            color: color.into(),
            kind,
            values,
        }
    }
}

/// What to draw: overlays plus one height ratio per panel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartRequest {
    pub overlays: Vec<OverlaySeries>,
    pub panel_ratios: Vec<u32>,
}

impl ChartRequest {
    /// Build the standard layout from the display toggles: MAs and Bollinger
    /// bands over the candles, then one panel each for volume, KD, MACD, RSI.
    pub fn from_preferences(rows: &[IndicatorRow], prefs: &DisplayPreferences) -> Self {
        let column = |f: fn(&IndicatorRow) -> Option<f64>| rows.iter().map(f).collect::<Vec<_>>();
        let mut overlays = Vec::new();
        let mut panel_ratios = vec![PRICE_PANEL_RATIO];

        for &window in &prefs.moving_averages {
            let values = rows.iter().map(|r| r.ma(window)).collect();
            overlays.push(OverlaySeries::new(format!("MA{window}"), 0, ma_color(window), PlotKind::Line, values));
        }

        if prefs.show_bollinger {
            overlays.push(OverlaySeries::new("BB_Up", 0, "#9e9e9e", PlotKind::Line, column(|r| r.bb_up)));
            overlays.push(OverlaySeries::new("BB_Mid", 0, "#bdbdbd", PlotKind::Line, column(|r| r.bb_mid)));
            overlays.push(OverlaySeries::new("BB_Low", 0, "#9e9e9e", PlotKind::Line, column(|r| r.bb_low)));
        }

        let mut next_panel = |overlays: &mut Vec<OverlaySeries>, series: Vec<OverlaySeries>| {
            let panel = panel_ratios.len();
            panel_ratios.push(INDICATOR_PANEL_RATIO);
            overlays.extend(series.into_iter().map(|s| OverlaySeries { panel, ..s }));
        };

        if prefs.show_volume {
            let volume = rows.iter().map(|r| Some(r.bar.volume as f64)).collect();
            next_panel(&mut overlays, vec![OverlaySeries::new("Volume", 0, "#78909c", PlotKind::Bar, volume)]);
        }
        if prefs.show_kd {
            next_panel(
                &mut overlays,
                vec![
                    OverlaySeries::new("K", 0, "#ff9800", PlotKind::Line, column(|r| r.k)),
                    OverlaySeries::new("D", 0, "#2196f3", PlotKind::Line, column(|r| r.d)),
                ],
            );
        }
        if prefs.show_macd {
            next_panel(
                &mut overlays,
                vec![
                    OverlaySeries::new("MACD", 0, "#37474f", PlotKind::Line, column(|r| r.macd)),
                    OverlaySeries::new("Signal", 0, "#e53935", PlotKind::Line, column(|r| r.signal)),
                    OverlaySeries::new("Hist", 0, "#90a4ae", PlotKind::Bar, column(|r| r.hist)),
                ],
            );
        }
        if prefs.show_rsi {
            next_panel(
                &mut overlays,
                vec![OverlaySeries::new("RSI", 0, "#8e24aa", PlotKind::Line, column(|r| r.rsi))],
            );
        }

        Self {
            overlays,
            panel_ratios,
        }
    }
}

fn ma_color(window: usize) -> &'static str {
    match window {
        5 => "#f5a623",
        10 => "#4a90e2",
        20 => "#bd10e0",
        60 => "#7ed321",
        _ => "#607d8b",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPanel {
    pub index: usize,
    pub ratio: u32,
    pub series: Vec<OverlaySeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartFigure {
    pub title: String,
    pub dates: Vec<NaiveDate>,
    pub candles: Vec<PriceBar>,
    pub panels: Vec<ChartPanel>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ChartRenderer;

impl ChartRenderer {
    pub fn render(
        &self,
        title: &str,
        rows: &[IndicatorRow],
        request: &ChartRequest,
    ) -> Result<ChartFigure, DashboardError> {
        if rows.is_empty() {
            return Err(DashboardError::Render("nothing to plot: empty table".into()));
        }
        if request.panel_ratios.is_empty() {
            return Err(DashboardError::Render("no panel ratios given".into()));
        }
        if let Some(i) = request.panel_ratios.iter().position(|&r| r == 0) {
            return Err(DashboardError::Render(format!("panel {i} has a zero height ratio")));
        }

        let mut panels: Vec<ChartPanel> = request
            .panel_ratios
            .iter()
            .enumerate()
            .map(|(index, &ratio)| ChartPanel {
                index,
                ratio,
                series: Vec::new(),
            })
            .collect();

        for overlay in &request.overlays {
            if overlay.values.len() != rows.len() {
                return Err(DashboardError::Render(format!(
                    "overlay '{}' has {} points for {} rows",
                    overlay.name,
                    overlay.values.len(),
                    rows.len()
                )));
            }
            let panel_count = panels.len();
            let panel = panels.get_mut(overlay.panel).ok_or_else(|| {
                DashboardError::Render(format!(
                    "overlay '{}' targets panel {} but only {} panels are defined",
                    overlay.name, overlay.panel, panel_count
                ))
            })?;
            panel.series.push(overlay.clone());
        }

        if let Some(empty) = panels.iter().skip(1).find(|p| p.series.is_empty()) {
            return Err(DashboardError::Render(format!(
                "panel {} has no series to draw",
                empty.index
            )));
        }

        debug!(title, panels = panels.len(), overlays = request.overlays.len(), "chart rendered");

        Ok(ChartFigure {
            title: title.to_string(),
            dates: rows.iter().map(|r| r.bar.date).collect(),
            candles: rows.iter().map(|r| r.bar.clone()).collect(),
            panels,
        })
    }
}
