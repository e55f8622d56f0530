use crate::config::Config;
use crate::filters::passes_pattern;
use crate::rng::Rng;
use crate::types::{Candidate, WeightedRound};
use log::{debug, warn};
use rand::seq::index;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// One pick per contiguous sector of the universe, then uniform top-up.
    #[default]
    Balanced,
    /// Picks drawn from a population weighted by historical frequency.
    Frequency,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "balanced" | "spread" => Ok(Strategy::Balanced),
            "frequency" | "hot" => Ok(Strategy::Frequency),
            other => Err(format!("unknown strategy '{}' (balanced|frequency)", other)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Balanced => f.write_str("balanced"),
            Strategy::Frequency => f.write_str("frequency"),
        }
    }
}

/// What to synthesize.
#[derive(Debug, Clone, Copy)]
pub struct GenerationPlan<'a> {
    pub max_ball: u32,
    /// Numbers per selection.
    pub length: usize,
    pub count: usize,
    pub strategy: Strategy,
    /// Numbers every selection must contain.
    pub whitelist: &'a BTreeSet<u32>,
    pub id_prefix: &'a str,
}

/// Synthesizes up to `plan.count` quality-filtered selections.
///
/// Stops after `count * attempts_per_result` attempts, so infeasible plans (whitelist larger than
/// the selection, degenerate sectors, a population too thin to fill a selection) return fewer
/// results instead of looping. Identical selections within one batch are not repeated.
pub fn generate(
    rounds: &[WeightedRound],
    plan: &GenerationPlan<'_>,
    config: &Config,
    rng: &mut Rng,
) -> Vec<Candidate> {
    let mut generated = Vec::with_capacity(plan.count);
    if plan.count == 0 || plan.length == 0 || plan.max_ball == 0 {
        return generated;
    }

    let needed = plan.length.saturating_sub(plan.whitelist.len());
    let population = match plan.strategy {
        Strategy::Frequency => frequency_population(rounds, config.frequency_repeat_scale),
        Strategy::Balanced => Vec::new(),
    };

    let max_attempts = plan.count * config.attempts_per_result;
    let mut seen: HashSet<Vec<u32>> = HashSet::new();
    let mut ids: HashSet<String> = HashSet::new();
    let mut attempts = 0;

    while generated.len() < plan.count && attempts < max_attempts {
        attempts += 1;

        let mut current: BTreeSet<u32> = plan.whitelist.clone();
        if needed > 0 {
            let filled = match plan.strategy {
                Strategy::Balanced => fill_balanced(&mut current, plan, needed, rng),
                Strategy::Frequency if !population.is_empty() => {
                    fill_from_population(&mut current, plan.length, &population, needed + config.frequency_oversample, rng)
                }
                Strategy::Frequency => fill_uniform(&mut current, plan, rng),
            };
            if !filled {
                continue;
            }
        }

        if current.len() != plan.length {
            continue;
        }

        let numbers: Vec<u32> = current.into_iter().collect();
        if !passes_pattern(&numbers, config) || !seen.insert(numbers.clone()) {
            continue;
        }

        let id = fresh_id(plan.id_prefix, &mut ids, rng);
        generated.push(Candidate { id, numbers });
    }

    if generated.len() < plan.count {
        warn!(
            "[Generator] {} of {} selections after {} attempts ({} strategy)",
            generated.len(),
            plan.count,
            attempts,
            plan.strategy
        );
    } else {
        debug!("[Generator] {} selections in {} attempts", generated.len(), attempts);
    }
    generated
}

const ID_SPACE_MASK: u64 = (1 << 40) - 1;

/// `{prefix}_{10 hex digits}` not yet in `taken`, which is updated.
///
/// Starts at a random point of a 2^40 id space and probes forward, so it needs at most
/// `taken.len() + 1` steps and ids from separate runs practically never meet.
pub fn fresh_id(prefix: &str, taken: &mut HashSet<String>, rng: &mut Rng) -> String {
    let mut n = rng.next_u64() & ID_SPACE_MASK;
    loop {
        let id = format!("{}_{:010X}", prefix, n);
        if taken.insert(id.clone()) {
            return id;
        }
        n = (n + 1) & ID_SPACE_MASK;
    }
}

/// Each observed number repeated `round(total_weight * scale)` times, in ascending order.
fn frequency_population(rounds: &[WeightedRound], scale: f64) -> Vec<u32> {
    let mut freq: BTreeMap<u32, f64> = BTreeMap::new();
    for r in rounds {
        for &n in &r.numbers {
            *freq.entry(n).or_insert(0.0) += r.weight;
        }
    }
    freq.into_iter()
        .flat_map(|(n, w)| std::iter::repeat(n).take((w * scale).round() as usize))
        .collect()
}

fn fill_balanced(current: &mut BTreeSet<u32>, plan: &GenerationPlan<'_>, needed: usize, rng: &mut Rng) -> bool {
    let sector = plan.max_ball / needed as u32;
    if sector == 0 {
        return false;
    }
    for i in 0..needed as u32 {
        let start = i * sector + 1;
        let end = ((i + 1) * sector).min(plan.max_ball);
        match rng.ball_in(start, end) {
            Some(pick) => {
                current.insert(pick);
            }
            None => return false,
        }
    }
    fill_uniform(current, plan, rng)
}

fn fill_uniform(current: &mut BTreeSet<u32>, plan: &GenerationPlan<'_>, rng: &mut Rng) -> bool {
    if (plan.max_ball as usize) < plan.length {
        return false;
    }
    while current.len() < plan.length {
        if let Some(n) = rng.ball_in(1, plan.max_ball) {
            current.insert(n);
        }
    }
    true
}

/// Samples without replacement from `population`; duplicates of a number collapse, which the
/// oversampling buffer absorbs.
fn fill_from_population(
    current: &mut BTreeSet<u32>,
    length: usize,
    population: &[u32],
    draw: usize,
    rng: &mut Rng,
) -> bool {
    let amount = draw.min(population.len());
    for i in index::sample(rng, population.len(), amount) {
        if current.len() == length {
            break;
        }
        current.insert(population[i]);
    }
    current.len() == length
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::source_weight;

    fn history() -> Vec<WeightedRound> {
        let raw: [[u32; 6]; 4] = [
            [3, 9, 17, 25, 33, 41],
            [5, 9, 21, 25, 38, 47],
            [2, 9, 14, 25, 30, 44],
            [7, 12, 19, 28, 36, 45],
        ];
        raw.iter()
            .enumerate()
            .map(|(i, r)| WeightedRound {
                numbers: r.to_vec(),
                source: (i + 1) as u8,
                weight: source_weight((i + 1) as u8),
            })
            .collect()
    }

    fn plan<'a>(strategy: Strategy, count: usize, whitelist: &'a BTreeSet<u32>) -> GenerationPlan<'a> {
        GenerationPlan {
            max_ball: 49,
            length: 6,
            count,
            strategy,
            whitelist,
            id_prefix: "GEN",
        }
    }

    #[test]
    fn balanced_selections_spread_across_sectors() {
        let cfg = Config::default();
        let wl = BTreeSet::new();
        let mut rng = Rng::from_seed(11);
        let out = generate(&history(), &plan(Strategy::Balanced, 50, &wl), &cfg, &mut rng);
        assert_eq!(out.len(), 50);
        for c in &out {
            assert_eq!(c.numbers.len(), 6);
            assert!(c.numbers.iter().all(|&n| (1..=49).contains(&n)));
            let sectors: BTreeSet<u32> = c.numbers.iter().map(|n| (n - 1) / 8).collect();
            assert!(sectors.len() >= 4, "{:?} covers only {:?}", c.numbers, sectors);
            assert!(passes_pattern(&c.numbers, &cfg));
        }
    }

    #[test]
    fn frequency_strategy_draws_from_history() {
        let cfg = Config::default();
        let wl = BTreeSet::new();
        let observed: BTreeSet<u32> = history().iter().flat_map(|r| r.numbers.clone()).collect();
        let mut rng = Rng::from_seed(5);
        let out = generate(&history(), &plan(Strategy::Frequency, 20, &wl), &cfg, &mut rng);
        assert!(!out.is_empty());
        for c in &out {
            assert_eq!(c.numbers.len(), 6);
            assert!(c.numbers.iter().all(|n| observed.contains(n)));
        }
    }

    #[test]
    fn frequency_without_history_falls_back_to_uniform() {
        let cfg = Config::default();
        let wl = BTreeSet::new();
        let mut rng = Rng::from_seed(8);
        let out = generate(&[], &plan(Strategy::Frequency, 10, &wl), &cfg, &mut rng);
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn whitelist_is_always_included() {
        let cfg = Config::default();
        let wl: BTreeSet<u32> = [7, 40].into_iter().collect();
        let mut rng = Rng::from_seed(21);
        let out = generate(&history(), &plan(Strategy::Balanced, 30, &wl), &cfg, &mut rng);
        assert!(!out.is_empty());
        for c in &out {
            assert!(c.numbers.contains(&7) && c.numbers.contains(&40));
        }
    }

    #[test]
    fn infeasible_plan_terminates_with_nothing() {
        let cfg = Config::default();
        let wl: BTreeSet<u32> = (1..=8).map(|n| n * 5).collect();
        let mut rng = Rng::from_seed(1);
        let out = generate(&history(), &plan(Strategy::Balanced, 25, &wl), &cfg, &mut rng);
        assert!(out.is_empty());
    }

    #[test]
    fn ids_and_selections_are_unique_within_a_batch() {
        let cfg = Config::default();
        let wl = BTreeSet::new();
        let mut rng = Rng::from_seed(77);
        let out = generate(&history(), &plan(Strategy::Balanced, 200, &wl), &cfg, &mut rng);
        let ids: HashSet<_> = out.iter().map(|c| c.id.clone()).collect();
        let sets: HashSet<_> = out.iter().map(|c| c.numbers.clone()).collect();
        assert_eq!(ids.len(), out.len());
        assert_eq!(sets.len(), out.len());
        assert!(out.iter().all(|c| c.id.starts_with("GEN_")));
    }

    #[test]
    fn taken_ids_are_skipped() {
        let rng = Rng::from_seed(3);
        let first = fresh_id("EVO", &mut HashSet::new(), &mut rng.clone());
        let mut only_first: HashSet<String> = [first.clone()].into_iter().collect();
        let second = fresh_id("EVO", &mut only_first, &mut rng.clone());

        let mut taken: HashSet<String> = [first.clone(), second.clone()].into_iter().collect();
        let third = fresh_id("EVO", &mut taken, &mut rng.clone());
        assert_ne!(second, first);
        assert!(third != first && third != second);
        assert_eq!(taken.len(), 3);
        assert_eq!(third.len(), "EVO_".len() + 10);
    }

    #[test]
    fn batches_larger_than_a_five_digit_id_space_finish() {
        let cfg = Config::default();
        let wl = BTreeSet::new();
        let mut rng = Rng::from_seed(31);
        let out = generate(&[], &plan(Strategy::Balanced, 95_000, &wl), &cfg, &mut rng);
        assert_eq!(out.len(), 95_000);
        let ids: HashSet<_> = out.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), out.len());
    }
}
