use crate::backtest::BacktestResult;
use crate::config::Config;
use crate::types::{overlap, sort_by_score_desc, BacktestRecord, ScoredCandidate};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Would admitting `numbers` push any single number above `limit` of the portfolio?
///
/// The first `exposure_grace_period` entries are always admitted.
pub fn can_admit(numbers: &[u32], entries: &[ScoredCandidate], limit: f64, config: &Config) -> bool {
    let next_len = entries.len() + 1;
    if next_len <= config.exposure_grace_period {
        return true;
    }
    numbers.iter().all(|n| {
        let count = entries.iter().filter(|e| e.numbers().contains(n)).count();
        (count + 1) as f64 / next_len as f64 <= limit
    })
}

/// Keeps the best of every group of entries differing by at most one number.
pub fn reduce(mut entries: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
    sort_by_score_desc(&mut entries);
    let mut kept: Vec<ScoredCandidate> = Vec::with_capacity(entries.len());
    for candidate in entries {
        let needed = candidate.numbers().len().saturating_sub(1).max(1);
        let redundant = kept
            .iter()
            .any(|k| overlap(k.numbers(), candidate.numbers()) >= needed);
        if !redundant {
            kept.push(candidate);
        }
    }
    kept
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdmissionReport {
    pub added: usize,
    pub rejected_risk: usize,
    pub skipped_duplicate: usize,
}

/// Accepted selections, unique by id and by number set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    entries: Vec<ScoredCandidate>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ScoredCandidate] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&ScoredCandidate> {
        self.entries.iter().find(|e| e.id() == id)
    }

    /// Admits `results` in order. Duplicates (by id or by numbers) are skipped, and anything
    /// the exposure guard refuses is counted as a risk rejection.
    pub fn admit_batch(&mut self, results: &[ScoredCandidate], limit: f64, config: &Config) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        let mut ids: HashSet<String> = self.entries.iter().map(|e| e.id().to_string()).collect();
        let mut sets: HashSet<Vec<u32>> = self.entries.iter().map(|e| e.numbers().to_vec()).collect();

        for candidate in results {
            if ids.contains(candidate.id()) || sets.contains(candidate.numbers()) {
                report.skipped_duplicate += 1;
                continue;
            }
            if !can_admit(candidate.numbers(), &self.entries, limit, config) {
                report.rejected_risk += 1;
                continue;
            }
            ids.insert(candidate.id().to_string());
            sets.insert(candidate.numbers().to_vec());
            self.entries.push(candidate.clone());
            report.added += 1;
        }

        info!(
            "[Portfolio] +{} added, {} over exposure {:.0}%, {} duplicates ({} total)",
            report.added,
            report.rejected_risk,
            limit * 100.0,
            report.skipped_duplicate,
            self.entries.len()
        );
        report
    }

    /// Compacts near-duplicates; returns how many entries were dropped.
    pub fn reduce(&mut self) -> usize {
        let before = self.entries.len();
        self.entries = reduce(std::mem::take(&mut self.entries));
        let removed = before - self.entries.len();
        debug!("[Portfolio] Reducer removed {} of {}", removed, before);
        removed
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id() != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }

    /// `(number, entries containing it, fraction of the portfolio)`, most exposed first.
    pub fn number_exposure(&self) -> Vec<(u32, usize, f64)> {
        let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
        for e in &self.entries {
            for &n in e.numbers() {
                *counts.entry(n).or_default() += 1;
            }
        }
        let total = self.entries.len().max(1) as f64;
        let mut out: Vec<(u32, usize, f64)> = counts
            .into_iter()
            .map(|(n, c)| (n, c, c as f64 / total))
            .collect();
        out.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Writes hit counts and labels onto matching entries; returns how many were updated.
    pub fn apply_backtest(&mut self, results: &[BacktestResult]) -> usize {
        let by_id: BTreeMap<&str, &BacktestResult> = results.iter().map(|r| (r.id.as_str(), r)).collect();
        let mut updated = 0;
        for entry in &mut self.entries {
            if let Some(r) = by_id.get(entry.id()) {
                entry.backtest = Some(BacktestRecord {
                    hits: r.hits,
                    label: r.label,
                });
                updated += 1;
            }
        }
        updated
    }
}
