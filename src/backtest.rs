use crate::config::Config;
use crate::types::{overlap, Label, Round, ScoredCandidate, TierCounts};
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Aggregate over the whole portfolio. `total_wins` counts every round that matched a
/// selection on two or more numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestStats {
    pub total_wins: u32,
    pub hits4: u32,
    pub hits3: u32,
    pub hits2: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub id: String,
    pub numbers: Vec<u32>,
    pub hits: u32,
    pub label: Option<Label>,
}

/// Replays `entries` against held-out rounds. Entries are not modified; see
/// `Portfolio::apply_backtest` for the write-back.
pub fn backtest(entries: &[ScoredCandidate], test_rounds: &[Round], config: &Config) -> (BacktestStats, Vec<BacktestResult>) {
    let per_entry: Vec<(BacktestResult, TierCounts)> = entries
        .par_iter()
        .map(|entry| {
            let mut tiers = TierCounts::default();
            let mut hits = 0u32;
            for round in test_rounds {
                let n = overlap(entry.numbers(), round.numbers());
                if n >= 2 {
                    hits += 1;
                    tiers.record(n);
                }
            }

            let label = if tiers.four_plus > 0 {
                Some(Label::Gold)
            } else if hits >= config.silver_min_hits {
                Some(Label::Silver)
            } else if hits > 0 {
                Some(Label::Bronze)
            } else {
                None
            };

            let result = BacktestResult {
                id: entry.id().to_string(),
                numbers: entry.numbers().to_vec(),
                hits,
                label,
            };
            (result, tiers)
        })
        .collect();

    let mut stats = BacktestStats::default();
    let mut results = Vec::with_capacity(per_entry.len());
    for (result, tiers) in per_entry {
        stats.total_wins += result.hits;
        stats.hits4 += tiers.four_plus;
        stats.hits3 += tiers.three;
        stats.hits2 += tiers.two;
        results.push(result);
    }

    info!(
        "[Backtest] {} selections x {} rounds: {} wins (4+: {}, 3: {}, 2: {})",
        entries.len(),
        test_rounds.len(),
        stats.total_wins,
        stats.hits4,
        stats.hits3,
        stats.hits2
    );
    (stats, results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candidate, CandidateKind};

    fn entry(id: &str, numbers: &[u32]) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate::new(id, numbers.iter().copied()),
            score: 1.0,
            tiers: TierCounts::default(),
            coverage: 0,
            active_sources: 0,
            kind: CandidateKind::Raw,
            backtest: None,
        }
    }

    #[test]
    fn four_hit_earns_gold() {
        let cfg = Config::default();
        let rounds = vec![Round::new([1, 2, 3, 4, 9, 9]), Round::new([7, 8, 9, 10, 11, 12])];
        let (stats, results) = backtest(&[entry("T", &[1, 2, 3, 4, 5, 6])], &rounds, &cfg);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hits, 1);
        assert_eq!(results[0].label, Some(Label::Gold));
        assert_eq!(stats, BacktestStats { total_wins: 1, hits4: 1, hits3: 0, hits2: 0 });
    }

    #[test]
    fn labels_by_hit_count() {
        let cfg = Config::default();
        let rounds: Vec<Round> = (0..5).map(|i| Round::new([1, 2, 20 + i, 30 + i])).collect();
        let entries = [
            entry("many", &[1, 2, 40, 45]),
            entry("one", &[1, 20, 41, 46]),
            entry("none", &[5, 6, 7, 8]),
        ];
        let (stats, results) = backtest(&entries, &rounds, &cfg);

        assert_eq!((results[0].hits, results[0].label), (5, Some(Label::Silver)));
        assert_eq!((results[1].hits, results[1].label), (1, Some(Label::Bronze)));
        assert_eq!((results[2].hits, results[2].label), (0, None));
        assert_eq!(stats.hits2, 6);
        assert_eq!(stats.total_wins, 6);
    }

    #[test]
    fn silver_threshold_is_configurable() {
        let mut cfg = Config::default();
        cfg.silver_min_hits = 3;
        let rounds: Vec<Round> = (0..3).map(|i| Round::new([1, 2, 20 + i])).collect();
        let (_, results) = backtest(&[entry("x", &[1, 2, 40])], &rounds, &cfg);
        assert_eq!(results[0].label, Some(Label::Silver));
    }
}
