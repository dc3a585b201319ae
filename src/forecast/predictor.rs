//! Stateless inference over a week-price snapshot.
//!
//! Expands every pattern into its phase-length combinations, eliminates
//! each combination an observed price contradicts, and aggregates the
//! survivors into per-slot price bounds plus a likelihood-ranked pattern
//! list. Pure integer range math; nothing here holds state between calls.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::pattern::{combinations, prior_weights, PatternKind, SlotFactors};
use crate::types::{PriceRange, Slot, WeekPriceSeries, SLOTS_PER_WEEK};

/// Base-price domain substituted while the Sunday buy price is unknown.
pub const BASE_PRICE_DOMAIN: (u32, u32) = (90, 110);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ForecastError {
    /// Every pattern was eliminated; the logged prices contradict the
    /// whole catalogue (almost always a data-entry slip).
    #[error("observed prices are inconsistent with every known pattern")]
    NoPatternMatchesObservations,
}

/// One surviving pattern with its normalized probability mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    pub kind: PatternKind,
    /// Normalized weight; sums to 1 across the ranked list.
    pub weight: f64,
    pub surviving_combinations: usize,
    pub total_combinations: usize,
}

/// Ephemeral prediction output; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Feasible price bounds per slot. Observed slots collapse to the
    /// logged price; unobserved slots are the union over every surviving
    /// (pattern, phase-length) candidate.
    pub slot_ranges: [PriceRange; SLOTS_PER_WEEK],
    /// Surviving patterns, highest weight first.
    pub patterns: Vec<PatternScore>,
}

impl PredictionResult {
    /// Highest-weighted surviving pattern; callers persist this to seed
    /// next week's prior.
    pub fn top_pattern(&self) -> Option<PatternKind> {
        self.patterns.first().map(|score| score.kind)
    }

    pub fn range_at(&self, slot: Slot) -> PriceRange {
        self.slot_ranges[slot.index()]
    }
}

/// Predict feasible prices and the likely pattern from a partial week.
///
/// `previous_pattern` is last week's regime as tracked by the caller; it
/// only shifts the prior, never which candidates survive. With an empty
/// series this returns the unconditional weekly bounds with all four
/// patterns alive.
pub fn predict(
    series: &WeekPriceSeries,
    previous_pattern: Option<PatternKind>,
) -> Result<PredictionResult, ForecastError> {
    let base = series.buy_price.map_or(BASE_PRICE_DOMAIN, |buy| (buy, buy));
    let priors = prior_weights(previous_pattern);

    let mut union: [PriceRange; SLOTS_PER_WEEK] = [PriceRange::exact(0); SLOTS_PER_WEEK];
    let mut any_survivor = false;
    let mut scores = Vec::with_capacity(PatternKind::ALL.len());

    for kind in PatternKind::ALL {
        let combos = combinations(kind);
        let total = combos.len();
        let mut surviving = 0usize;

        for combo in &combos {
            let ranges = absolute_ranges(combo, base);
            if !fits_observations(series, &ranges) {
                continue;
            }
            surviving += 1;
            if any_survivor {
                for (acc, range) in union.iter_mut().zip(ranges.iter()) {
                    *acc = acc.union(*range);
                }
            } else {
                union = ranges;
                any_survivor = true;
            }
        }

        debug!(
            ?kind,
            surviving, total, "filtered phase-length combinations"
        );
        if surviving > 0 {
            scores.push(PatternScore {
                kind,
                weight: priors[kind.index()] as f64 * surviving as f64 / total as f64,
                surviving_combinations: surviving,
                total_combinations: total,
            });
        }
    }

    if scores.is_empty() {
        debug!("all patterns eliminated by the observations");
        return Err(ForecastError::NoPatternMatchesObservations);
    }

    let mass: f64 = scores.iter().map(|score| score.weight).sum();
    for score in &mut scores {
        score.weight /= mass;
    }
    // Descending weight; catalogue order breaks ties so identical inputs
    // always rank identically.
    scores.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.kind.index().cmp(&b.kind.index()))
    });

    let mut slot_ranges = union;
    for (slot, price) in series.observed() {
        slot_ranges[slot.index()] = PriceRange::exact(price);
    }

    Ok(PredictionResult {
        slot_ranges,
        patterns: scores,
    })
}

fn absolute_ranges(factors: &SlotFactors, base: (u32, u32)) -> [PriceRange; SLOTS_PER_WEEK] {
    let mut ranges = [PriceRange::exact(0); SLOTS_PER_WEEK];
    for (range, factor) in ranges.iter_mut().zip(factors.iter()) {
        *range = factor.price_range(base);
    }
    ranges
}

/// A combination stays alive only if every observed price sits inside its
/// derived range for that slot.
fn fits_observations(series: &WeekPriceSeries, ranges: &[PriceRange; SLOTS_PER_WEEK]) -> bool {
    series
        .observed()
        .all(|(slot, price)| ranges[slot.index()].contains(price))
}
