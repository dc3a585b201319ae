//! Price ledger - per-user weekly observation store.
//!
//! Owns every user's observed prices for the current in-game week and the
//! archive of the week before it. The forecast engine consumes the
//! immutable snapshots this module hands out.

pub mod price_ledger;
pub mod types;

pub use price_ledger::PriceLedger;
pub use types::{BestPrice, LedgerConfig, LedgerError, Observation, MAX_PRICE};
