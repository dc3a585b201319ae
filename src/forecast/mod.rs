//! Pattern inference engine.
//!
//! Stateless computation over a [`WeekPriceSeries`](crate::types::WeekPriceSeries)
//! snapshot: which of the four weekly price patterns fit the observations
//! so far, and what prices remain feasible in the unobserved slots.

pub mod pattern;
pub mod predictor;
pub mod simulate;

pub use pattern::{prior_weights, FactorRange, PatternKind};
pub use predictor::{predict, ForecastError, PatternScore, PredictionResult, BASE_PRICE_DOMAIN};
pub use simulate::sample_week;
