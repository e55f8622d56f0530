use crate::config::Config;
use crate::detect::detect;
use crate::types::{source_weight, Candidate, GameShape, Round, SourceId, WeightedRound, MAX_SOURCES};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Accepted vs skipped non-blank lines of one ingestion pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub accepted: usize,
    pub skipped: usize,
}

fn numeric_tokens(text: &str) -> impl Iterator<Item = u32> + '_ {
    text.split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|t| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|t| t.parse::<u32>().ok())
        .filter(|&n| n > 0)
}

/// One round per line; delimiters may be commas, semicolons or spaces.
/// Lines with fewer than two numbers yield `None`.
pub fn parse_round_line(line: &str) -> Option<Round> {
    let round = Round::new(numeric_tokens(line));
    (round.len() >= 2).then_some(round)
}

pub fn parse_rounds(text: &str) -> (Vec<Round>, ParseReport) {
    let mut report = ParseReport::default();
    let mut rounds = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        match parse_round_line(line) {
            Some(r) => {
                rounds.push(r);
                report.accepted += 1;
            }
            None => report.skipped += 1,
        }
    }
    (rounds, report)
}

/// `id, n n n ...` or a bare list of numbers (which gets `fallback_id`).
pub fn parse_candidate_line(line: &str, fallback_id: &str) -> Option<Candidate> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let explicit = line.split_once(',').and_then(|(head, tail)| {
        let head = head.trim();
        let spaced = tail.split_whitespace().filter(|t| t.parse::<u32>().is_ok()).count();
        (!head.is_empty() && spaced >= 2).then_some((head, tail))
    });

    let (id, body) = match explicit {
        Some((head, tail)) => (head.to_string(), tail),
        None => match line.split_whitespace().next() {
            Some(first) if first.parse::<u32>().is_err() && !first.contains(',') => {
                (first.to_string(), &line[first.len()..])
            }
            _ => (fallback_id.to_string(), line),
        },
    };

    let candidate = Candidate::new(id, numeric_tokens(body));
    (candidate.len() >= 2).then_some(candidate)
}

/// Bare lines get ids `{prefix}_{0001}`, numbered by line position.
pub fn parse_candidates(text: &str, id_prefix: &str) -> (Vec<Candidate>, ParseReport) {
    let mut report = ParseReport::default();
    let mut out = Vec::new();
    for (i, line) in text.lines().filter(|l| !l.trim().is_empty()).enumerate() {
        let fallback = format!("{}_{:04}", id_prefix, i + 1);
        match parse_candidate_line(line, &fallback) {
            Some(c) => {
                out.push(c);
                report.accepted += 1;
            }
            None => report.skipped += 1,
        }
    }
    (out, report)
}

/// Blacklist / whitelist text such as `"13, 66"`.
pub fn parse_number_set(text: &str) -> BTreeSet<u32> {
    numeric_tokens(text).collect()
}

/// Historical rounds per weighted source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDatabase {
    sources: BTreeMap<SourceId, Vec<Round>>,
}

impl RoundDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a source's rounds. Ids outside `1..=13` are ignored and return false.
    pub fn set_source(&mut self, source: SourceId, rounds: Vec<Round>) -> bool {
        if !(1..=MAX_SOURCES).contains(&source) {
            return false;
        }
        if rounds.is_empty() {
            self.sources.remove(&source);
        } else {
            self.sources.insert(source, rounds);
        }
        true
    }

    pub fn source(&self, source: SourceId) -> &[Round] {
        self.sources.get(&source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sources(&self) -> impl Iterator<Item = (SourceId, &[Round])> + '_ {
        self.sources.iter().map(|(&id, r)| (id, r.as_slice()))
    }

    pub fn active_sources(&self) -> usize {
        self.sources.values().filter(|r| !r.is_empty()).count()
    }

    pub fn total_rounds(&self) -> usize {
        self.sources.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_rounds() == 0
    }

    /// Drops every round identical to an earlier one (source order, then line order).
    /// Returns how many were removed.
    pub fn dedup(&mut self) -> usize {
        let mut seen: HashSet<Round> = HashSet::new();
        let mut removed = 0;
        for rounds in self.sources.values_mut() {
            let before = rounds.len();
            rounds.retain(|r| seen.insert(r.clone()));
            removed += before - rounds.len();
        }
        self.sources.retain(|_, r| !r.is_empty());
        if removed > 0 {
            debug!("[Rounds] Removed {} duplicate rounds", removed);
        }
        removed
    }

    pub fn unique_rounds(&self) -> Vec<&Round> {
        let set: BTreeSet<&Round> = self.sources.values().flatten().collect();
        set.into_iter().collect()
    }

    pub fn shape(&self, config: &Config) -> GameShape {
        detect(self.unique_rounds().into_iter().map(Round::numbers), config)
    }

    pub fn weighted_rounds(&self) -> Vec<WeightedRound> {
        self.sources
            .iter()
            .flat_map(|(&source, rounds)| {
                let weight = source_weight(source);
                rounds.iter().map(move |r| WeightedRound {
                    numbers: r.numbers().to_vec(),
                    source,
                    weight,
                })
            })
            .collect()
    }
}

/// Universes up to this size are listed densely, zero counts included.
const DENSE_HEATMAP_LIMIT: u32 = 1_000;

/// Occurrences of every number in `1..=max_ball` across the given rounds. Past
/// `DENSE_HEATMAP_LIMIT` only observed numbers are listed, so one stray huge number in an
/// import cannot blow up the table.
pub fn number_frequencies<'a>(rounds: impl IntoIterator<Item = &'a Round>, max_ball: u32) -> Vec<(u32, usize)> {
    let mut counts: BTreeMap<u32, usize> = BTreeMap::new();
    for r in rounds {
        for &n in r.numbers() {
            if n <= max_ball {
                *counts.entry(n).or_default() += 1;
            }
        }
    }
    let dense_end = max_ball.min(DENSE_HEATMAP_LIMIT);
    for n in 1..=dense_end {
        counts.entry(n).or_default();
    }
    counts.into_iter().collect()
}
