//! The four-pattern price catalogue.
//!
//! Each pattern is a fixed table of phases; a phase applies one
//! multiplicative factor range (integer percent of the base price) to a
//! run of slots. One phase per pattern has a variable length and one
//! absorbs the remainder, so each pattern expands to a small set of
//! phase-length combinations that each cover the full 12-slot week.

use serde::{Deserialize, Serialize};

use crate::types::{PriceRange, SLOTS_PER_WEEK};

/// One of the four mutually exclusive weekly price regimes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternKind {
    /// High/low alternation with no sustained trend.
    Fluctuating,
    /// Early decline into one sharp mid-week spike.
    LargeSpike,
    /// Monotone slide for the whole week.
    Decreasing,
    /// Gentler bump after a low stretch.
    SmallSpike,
}

impl PatternKind {
    pub const ALL: [PatternKind; 4] = [
        PatternKind::Fluctuating,
        PatternKind::LargeSpike,
        PatternKind::Decreasing,
        PatternKind::SmallSpike,
    ];

    /// Stable catalogue position, also the transition-matrix row/column.
    pub fn index(self) -> usize {
        match self {
            PatternKind::Fluctuating => 0,
            PatternKind::LargeSpike => 1,
            PatternKind::Decreasing => 2,
            PatternKind::SmallSpike => 3,
        }
    }

    fn phases(self) -> &'static [PhaseSpec] {
        match self {
            PatternKind::Fluctuating => FLUCTUATING,
            PatternKind::LargeSpike => LARGE_SPIKE,
            PatternKind::Decreasing => DECREASING,
            PatternKind::SmallSpike => SMALL_SPIKE,
        }
    }
}

/// Multiplicative range in integer percent of the base price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorRange {
    pub low: u32,
    pub high: u32,
}

impl FactorRange {
    pub const fn new(low: u32, high: u32) -> Self {
        Self { low, high }
    }

    /// Absolute inclusive price range for a base-price range. The low
    /// bound floors and the high bound ceils, so a feasible integer price
    /// is never excluded. Integer arithmetic throughout.
    pub fn price_range(self, base: (u32, u32)) -> PriceRange {
        PriceRange {
            low: self.low * base.0 / 100,
            high: (self.high * base.1 + 99) / 100,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum PhaseLen {
    Fixed(usize),
    Var { min: usize, max: usize },
    /// Absorbs whatever the other phases leave of the 12 slots.
    Fill,
}

#[derive(Debug, Clone, Copy)]
struct PhaseSpec {
    factors: FactorRange,
    len: PhaseLen,
}

const fn fixed(low: u32, high: u32) -> PhaseSpec {
    PhaseSpec {
        factors: FactorRange::new(low, high),
        len: PhaseLen::Fixed(1),
    }
}

const fn run(low: u32, high: u32, len: usize) -> PhaseSpec {
    PhaseSpec {
        factors: FactorRange::new(low, high),
        len: PhaseLen::Fixed(len),
    }
}

const fn var(low: u32, high: u32, min: usize, max: usize) -> PhaseSpec {
    PhaseSpec {
        factors: FactorRange::new(low, high),
        len: PhaseLen::Var { min, max },
    }
}

const fn fill(low: u32, high: u32) -> PhaseSpec {
    PhaseSpec {
        factors: FactorRange::new(low, high),
        len: PhaseLen::Fill,
    }
}

// Factor tables, in percent. Every length assignment must total 12 slots.

const FLUCTUATING: &[PhaseSpec] = &[
    var(90, 140, 0, 7),
    run(60, 90, 3),
    fill(90, 140),
];

const LARGE_SPIKE: &[PhaseSpec] = &[
    var(90, 95, 1, 7),
    fixed(90, 140),
    fixed(140, 200),
    fixed(200, 600),
    fixed(140, 200),
    fixed(90, 140),
    fill(40, 90),
];

const DECREASING: &[PhaseSpec] = &[var(85, 90, 3, 6), fill(30, 85)];

const SMALL_SPIKE: &[PhaseSpec] = &[
    var(40, 80, 0, 7),
    fixed(90, 140),
    fixed(90, 140),
    fixed(140, 200),
    fixed(140, 200),
    fixed(140, 200),
    fill(40, 80),
];

/// A fully resolved phase-length assignment: one factor range per slot.
pub(crate) type SlotFactors = [FactorRange; SLOTS_PER_WEEK];

/// Expand a pattern into every valid phase-length combination.
pub(crate) fn combinations(kind: PatternKind) -> Vec<SlotFactors> {
    let phases = kind.phases();
    let fixed_total: usize = phases
        .iter()
        .map(|phase| match phase.len {
            PhaseLen::Fixed(n) => n,
            _ => 0,
        })
        .sum();
    let var_bounds = phases.iter().find_map(|phase| match phase.len {
        PhaseLen::Var { min, max } => Some((min, max)),
        _ => None,
    });
    let has_fill = phases.iter().any(|phase| matches!(phase.len, PhaseLen::Fill));

    let (var_min, var_max) = var_bounds.unwrap_or((0, 0));
    let mut combos = Vec::new();
    for var_len in var_min..=var_max {
        let used = fixed_total + var_len;
        if used > SLOTS_PER_WEEK || (!has_fill && used != SLOTS_PER_WEEK) {
            continue;
        }
        let fill_len = SLOTS_PER_WEEK - used;

        let mut slots = [FactorRange::new(0, 0); SLOTS_PER_WEEK];
        let mut cursor = 0;
        for phase in phases {
            let len = match phase.len {
                PhaseLen::Fixed(n) => n,
                PhaseLen::Var { .. } => var_len,
                PhaseLen::Fill => fill_len,
            };
            for slot in &mut slots[cursor..cursor + len] {
                *slot = phase.factors;
            }
            cursor += len;
        }
        debug_assert_eq!(cursor, SLOTS_PER_WEEK);
        combos.push(slots);
    }
    combos
}

/// Week-over-week pattern transition priors, in percent. Rows follow
/// `PatternKind::index` order and each sums to 100. The figures are the
/// community-documented transition matrix; the engine only relies on
/// them being positive weights.
const TRANSITIONS: [[u32; 4]; 4] = [
    [20, 30, 15, 35], // after Fluctuating
    [50, 5, 20, 25],  // after LargeSpike
    [25, 45, 5, 25],  // after Decreasing
    [45, 25, 15, 15], // after SmallSpike
];

const UNIFORM_PRIOR: [u32; 4] = [25, 25, 25, 25];

/// Prior weight row for this week's pattern given last week's, or the
/// uniform prior when last week is unknown.
pub fn prior_weights(previous: Option<PatternKind>) -> [u32; 4] {
    match previous {
        Some(kind) => TRANSITIONS[kind.index()],
        None => UNIFORM_PRIOR,
    }
}
