//! Synthetic week generation for demos and round-trip testing.

use rand::Rng;

use super::pattern::{combinations, PatternKind};
use crate::types::{WeekPriceSeries, SLOTS_PER_WEEK};

/// Generate a full synthetic week that follows `kind`: draw one of its
/// phase-length combinations, then a uniform price inside each slot's
/// derived range. A sampled week is always consistent with its own
/// pattern under [`predict`](super::predict).
pub fn sample_week<R: Rng + ?Sized>(
    kind: PatternKind,
    buy_price: u32,
    rng: &mut R,
) -> WeekPriceSeries {
    let combos = combinations(kind);
    let combo = combos[rng.gen_range(0..combos.len())];
    let base = (buy_price, buy_price);

    let mut slot_prices = [None; SLOTS_PER_WEEK];
    for (price, factors) in slot_prices.iter_mut().zip(combo.iter()) {
        let range = factors.price_range(base);
        *price = Some(rng.gen_range(range.low..=range.high));
    }

    WeekPriceSeries {
        buy_price: Some(buy_price),
        slot_prices,
    }
}
