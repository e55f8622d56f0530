use serde::{Deserialize, Serialize};
use std::fmt;

/// Source feeds are numbered `1..=MAX_SOURCES`.
pub type SourceId = u8;
pub const MAX_SOURCES: SourceId = 13;

/// Recency weight of a source: later feeds weigh more, capped at 1.2.
pub fn source_weight(source: SourceId) -> f64 {
    (0.5 + 0.05 * source as f64).min(1.2)
}

/// One historical draw. Numbers are kept sorted and distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Round(Vec<u32>);

impl Round {
    pub fn new(numbers: impl IntoIterator<Item = u32>) -> Self {
        Round(normalize(numbers))
    }

    pub fn numbers(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A round tagged with its source and weight, rebuilt for every analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedRound {
    pub numbers: Vec<u32>,
    pub source: SourceId,
    pub weight: f64,
}

/// Universe size and selection length inferred from history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameShape {
    pub max_ball: u32,
    pub draw_length: usize,
}

impl fmt::Display for GameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.draw_length, self.max_ball)
    }
}

/// A proposed selection, not yet scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    /// Sorted, distinct.
    pub numbers: Vec<u32>,
}

impl Candidate {
    pub fn new(id: impl Into<String>, numbers: impl IntoIterator<Item = u32>) -> Self {
        Candidate {
            id: id.into(),
            numbers: normalize(numbers),
        }
    }

    pub fn len(&self) -> usize {
        self.numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.numbers.is_empty()
    }

    pub fn numbers_label(&self) -> String {
        join_numbers(&self.numbers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateKind {
    Raw,
    Generated,
    Evolved,
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CandidateKind::Raw => "RAW",
            CandidateKind::Generated => "GEN",
            CandidateKind::Evolved => "EVO",
        };
        f.write_str(s)
    }
}

/// How many historical rounds matched at 4+, 3 and 2 numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub four_plus: u32,
    pub three: u32,
    pub two: u32,
}

impl TierCounts {
    pub fn record(&mut self, intersection: usize) {
        match intersection {
            0 | 1 => {}
            2 => self.two += 1,
            3 => self.three += 1,
            _ => self.four_plus += 1,
        }
    }
}

impl fmt::Display for TierCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "4x:{}|3x:{}|2x:{}", self.four_plus, self.three, self.two)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Gold,
    Silver,
    Bronze,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Label::Gold => "*** GOLD ***",
            Label::Silver => "** SILVER **",
            Label::Bronze => "* BRONZE *",
        };
        f.write_str(s)
    }
}

/// Outcome of the last backtest, written back onto a portfolio entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub hits: u32,
    pub label: Option<Label>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
    pub tiers: TierCounts,
    /// Distinct sources in which the candidate scored.
    pub coverage: usize,
    /// Sources that held rounds when the candidate was scored.
    pub active_sources: usize,
    pub kind: CandidateKind,
    pub backtest: Option<BacktestRecord>,
}

impl ScoredCandidate {
    pub fn id(&self) -> &str {
        &self.candidate.id
    }

    pub fn numbers(&self) -> &[u32] {
        &self.candidate.numbers
    }

    pub fn coverage_label(&self) -> String {
        format!("{}/{}", self.coverage, self.active_sources)
    }

    pub fn label(&self) -> Option<Label> {
        self.backtest.and_then(|b| b.label)
    }
}

/// Descending by score. `sort_by` is stable, so equal scores keep insertion order.
pub fn sort_by_score_desc(items: &mut [ScoredCandidate]) {
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Size of the intersection of two sorted, distinct slices.
pub fn overlap(a: &[u32], b: &[u32]) -> usize {
    let (mut i, mut j, mut n) = (0, 0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                n += 1;
                i += 1;
                j += 1;
            }
        }
    }
    n
}

pub fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize(numbers: impl IntoIterator<Item = u32>) -> Vec<u32> {
    let mut v: Vec<u32> = numbers.into_iter().collect();
    v.sort_unstable();
    v.dedup();
    v
}
