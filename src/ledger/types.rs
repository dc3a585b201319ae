//! Ledger-facing types: the error taxonomy, insertion records, and
//! configuration.

use crate::types::{Slot, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest price the ledger accepts, in bells. The theoretical sell
/// ceiling is 6.00x a base of 110, so anything past this is a typo.
pub const MAX_PRICE: u32 = 1_000;

/// Errors returned by ledger mutations. The ledger never partially
/// applies a rejected mutation, and never formats user-facing copy; the
/// command layer maps these variants to whatever wording it wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Zero or implausibly large price.
    #[error("price {price} is outside the accepted domain 1..=1000 bells")]
    InvalidPrice { price: u32 },

    /// Slot index past the 12-slot week.
    #[error("slot index {index} is outside the 12-slot week")]
    InvalidSlot { index: usize },

    /// The slot already holds a logged price; it must be undone or
    /// cleared before it can be logged again.
    #[error("slot {slot:?} already has a logged price")]
    SlotAlreadySet { slot: Slot },

    /// Undo requested with no slot observations this week.
    #[error("no slot prices have been logged this week")]
    NothingToUndo,
}

/// One logged slot price, in the order the user entered it. Undo is
/// defined purely as removal of the maximum `seq`, so out-of-order slot
/// entry undoes correctly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub slot: Slot,
    pub price: u32,
    /// Insertion sequence within the user's current week.
    pub seq: u64,
    pub logged_at: DateTime<Utc>,
}

/// A user's best qualifying price inside the recency window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestPrice {
    pub user: UserId,
    pub price: u32,
    pub logged_at: DateTime<Utc>,
}

/// Ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Offset from UTC, in hours, of the community's in-game clock. Weeks
    /// roll over at Sunday 00:00 in this offset.
    pub utc_offset_hours: i32,
    /// How far back the best-price queries look, in hours.
    pub best_price_window_hours: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: 0,
            best_price_window_hours: 12,
        }
    }
}
