// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// dashboard. Every series function returns one `Option<f64>` per input bar so
// callers are forced to handle the "window not yet full" rows.

pub mod bollinger;
pub mod engine;
pub mod macd;
pub mod moving_average;
pub mod rolling;
pub mod rsi;
pub mod stochastic;

pub use engine::{IndicatorEngine, IndicatorRow, IndicatorStages};
