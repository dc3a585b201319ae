//! Core types shared by the price ledger and the forecast engine.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Chat-platform user identifier (a numeric snowflake).
pub type UserId = u64;

/// Number of half-day price slots in an in-game week (Monday AM through
/// Saturday PM; the shop is closed on Sunday).
pub const SLOTS_PER_WEEK: usize = 12;

/// One of the 12 half-day observation points in an in-game week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot(u8);

impl Slot {
    /// Build a slot from a raw index, or `None` when the index falls
    /// outside the 12-slot week.
    pub fn from_index(index: usize) -> Option<Self> {
        if index < SLOTS_PER_WEEK {
            Some(Slot(index as u8))
        } else {
            None
        }
    }

    /// Raw index in 0..=11, Monday AM first.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Weekday this slot falls on.
    pub fn day(self) -> Weekday {
        match self.0 / 2 {
            0 => Weekday::Mon,
            1 => Weekday::Tue,
            2 => Weekday::Wed,
            3 => Weekday::Thu,
            4 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }

    /// True for the morning half of a day, false for the afternoon.
    pub fn is_morning(self) -> bool {
        self.0 % 2 == 0
    }

    /// All 12 slots in chronological order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (0..SLOTS_PER_WEEK as u8).map(Slot)
    }
}

/// Inclusive price range in bells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: u32,
    pub high: u32,
}

impl PriceRange {
    /// Degenerate range holding a single observed price.
    pub fn exact(price: u32) -> Self {
        Self {
            low: price,
            high: price,
        }
    }

    pub fn contains(self, price: u32) -> bool {
        self.low <= price && price <= self.high
    }

    /// Smallest range covering both inputs.
    pub fn union(self, other: Self) -> Self {
        Self {
            low: self.low.min(other.low),
            high: self.high.max(other.high),
        }
    }
}

/// One user's observations for one in-game week: the Sunday buy price and
/// the half-day sell prices logged so far. Absent entries mean "not yet
/// observed". This is an immutable snapshot; all mutation goes through the
/// ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekPriceSeries {
    /// Sunday-morning base price, if logged.
    pub buy_price: Option<u32>,
    /// Half-day sell prices, indexed Monday AM .. Saturday PM.
    pub slot_prices: [Option<u32>; SLOTS_PER_WEEK],
}

impl WeekPriceSeries {
    pub fn price_at(&self, slot: Slot) -> Option<u32> {
        self.slot_prices[slot.index()]
    }

    /// Observed slots in chronological slot order.
    pub fn observed(&self) -> impl Iterator<Item = (Slot, u32)> + '_ {
        self.slot_prices
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.map(|price| (Slot(i as u8), price)))
    }

    pub fn observed_count(&self) -> usize {
        self.slot_prices.iter().filter(|p| p.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.buy_price.is_none() && self.slot_prices.iter().all(|p| p.is_none())
    }
}
