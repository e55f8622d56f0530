use crate::config::Config;
use crate::types::{overlap, GameShape, SourceId, TierCounts, WeightedRound};
use std::collections::BTreeSet;

/// Points awarded per intersection size, selected by candidate length and game type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PayoutTable(&'static [(usize, f64)]);

const FOUR_PICK: PayoutTable = PayoutTable(&[(4, 100.0), (3, 20.0), (2, 5.0)]);
const THREE_PICK: PayoutTable = PayoutTable(&[(3, 100.0), (2, 15.0)]);
const LOTTO: PayoutTable = PayoutTable(&[(6, 500.0), (5, 250.0), (4, 100.0), (3, 15.0), (2, 2.0)]);
const KENO: PayoutTable = PayoutTable(&[
    (10, 500.0),
    (9, 200.0),
    (8, 100.0),
    (7, 50.0),
    (6, 20.0),
    (5, 5.0),
    (4, 2.0),
]);

impl PayoutTable {
    pub fn select(candidate_len: usize, draw_length: usize) -> Self {
        match candidate_len {
            4 => FOUR_PICK,
            3 => THREE_PICK,
            _ if draw_length <= 7 => LOTTO,
            _ => KENO,
        }
    }

    pub fn points(&self, intersection: usize) -> Option<f64> {
        self.0
            .iter()
            .find(|(k, _)| *k == intersection)
            .map(|(_, p)| *p)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub total: f64,
    pub tiers: TierCounts,
    pub coverage: usize,
}

/// Weighted overlap of `numbers` (sorted) against history, plus structural bonuses
/// when history produced any points at all.
pub fn score(numbers: &[u32], rounds: &[WeightedRound], shape: GameShape, config: &Config) -> Score {
    let table = PayoutTable::select(numbers.len(), shape.draw_length);
    let mut total = 0.0;
    let mut tiers = TierCounts::default();
    let mut sources: BTreeSet<SourceId> = BTreeSet::new();

    for round in rounds {
        let hits = overlap(numbers, &round.numbers);
        if let Some(points) = table.points(hits) {
            total += points * round.weight;
            tiers.record(hits);
            sources.insert(round.source);
        }
    }

    if total > 0.0 {
        total += structural_bonus(numbers, shape.max_ball, config);
    }

    Score {
        total,
        tiers,
        coverage: sources.len(),
    }
}

/// Balance bonus for an even low/high split, spread bonus for a wide range.
pub fn structural_bonus(numbers: &[u32], max_ball: u32, config: &Config) -> f64 {
    let (Some(&lo), Some(&hi)) = (numbers.iter().min(), numbers.iter().max()) else {
        return 0.0;
    };
    let mut bonus = 0.0;

    let mid_point = max_ball as f64 / 2.0;
    let low = numbers.iter().filter(|&&n| n as f64 <= mid_point).count();
    let high = numbers.len() - low;
    if low.abs_diff(high) <= 1 {
        bonus += config.balance_bonus;
    }

    if (hi - lo) as f64 > max_ball as f64 * config.spread_fraction {
        bonus += config.spread_bonus;
    }
    bonus
}
