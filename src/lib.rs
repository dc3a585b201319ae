//! stalk-oracle - turnip price tracking and pattern forecasting
//!
//! This crate provides the core of a stalk-market assistant: a per-user
//! weekly price ledger and a stateless inference engine that narrows the
//! week's feasible prices and ranks the four known price patterns from a
//! partial sequence of observations. Chat commands, rendering, and
//! persistence are external collaborators built on top of it.

pub mod forecast;
pub mod ledger;
pub mod types;

// Re-export the main entry points for convenience
pub use forecast::{predict, PatternKind, PredictionResult};
pub use ledger::{LedgerError, PriceLedger};
pub use types::{Slot, WeekPriceSeries};
