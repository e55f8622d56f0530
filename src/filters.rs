use crate::config::Config;
use crate::types::GameShape;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Numbers the user forbids and numbers every accepted candidate must contain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConstraints {
    pub blacklist: BTreeSet<u32>,
    pub whitelist: BTreeSet<u32>,
}

impl UserConstraints {
    pub fn allows(&self, numbers: &[u32]) -> bool {
        passes_user_constraints(numbers, &self.blacklist, &self.whitelist)
    }
}

pub fn passes_user_constraints(
    numbers: &[u32],
    blacklist: &BTreeSet<u32>,
    whitelist: &BTreeSet<u32>,
) -> bool {
    if numbers.iter().any(|n| blacklist.contains(n)) {
        return false;
    }
    whitelist.iter().all(|w| numbers.contains(w))
}

/// Structural gates on a sorted selection. Every enabled gate must pass.
pub fn passes_pattern(sorted: &[u32], config: &Config) -> bool {
    if config.reject_consecutive_runs && has_consecutive_triplet(sorted) {
        return false;
    }
    if config.reject_decade_cluster && has_decade_cluster(sorted) {
        return false;
    }
    if config.reject_uniform_parity && has_uniform_parity(sorted) {
        return false;
    }
    true
}

/// Three sorted neighbours forming a step-1 run, e.g. 11, 12, 13.
pub fn has_consecutive_triplet(sorted: &[u32]) -> bool {
    sorted
        .windows(3)
        .any(|w| w[1] == w[0] + 1 && w[2] == w[0] + 2)
}

/// Some decade bucket (`n / 10`) holds more than `len - 1` numbers.
pub fn has_decade_cluster(numbers: &[u32]) -> bool {
    if numbers.len() < 2 {
        return false;
    }
    let mut buckets: HashMap<u32, usize> = HashMap::new();
    for n in numbers {
        *buckets.entry(n / 10).or_default() += 1;
    }
    buckets.values().any(|&c| c > numbers.len() - 1)
}

pub fn has_uniform_parity(numbers: &[u32]) -> bool {
    if numbers.len() < 2 {
        return false;
    }
    let first = numbers[0] % 2;
    numbers.iter().all(|n| n % 2 == first)
}

/// Loose plausibility band around the expected sum `len * (max_ball + 1) / 2`.
pub fn passes_sum_band(numbers: &[u32], shape: GameShape, config: &Config) -> bool {
    let ideal_sum = numbers.len() as f64 * (shape.max_ball as f64 + 1.0) / 2.0;
    let sum: u64 = numbers.iter().map(|&n| n as u64).sum();
    let sum = sum as f64;
    sum >= ideal_sum * config.sum_band_low && sum <= ideal_sum * config.sum_band_high
}
