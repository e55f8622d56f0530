use crate::config::{Config, ZombieRule};
use crate::filters::{passes_pattern, passes_sum_band, UserConstraints};
use crate::generator::Strategy;
use crate::ingest::RoundDatabase;
use crate::recombine::{recombine, Habitat};
use crate::rng::Rng;
use crate::scorer::score;
use crate::types::{sort_by_score_desc, Candidate, CandidateKind, GameShape, ScoredCandidate};
use log::{info, warn};
use rayon::prelude::*;
use std::fmt;

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub candidates: Vec<Candidate>,
    /// `Raw` for ingested tickets, `Generated` for a generator batch.
    pub kind: CandidateKind,
    pub top_n: usize,
    pub evo_count: usize,
    pub strict_filters: bool,
    pub constraints: UserConstraints,
    pub strategy: Strategy,
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            kind: CandidateKind::Raw,
            top_n: 100,
            evo_count: 15,
            strict_filters: true,
            constraints: UserConstraints::default(),
            strategy: Strategy::Balanced,
        }
    }
}

/// Why candidates disappeared, so callers can explain an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub rejected_user: usize,
    pub rejected_sum: usize,
    pub rejected_pattern: usize,
    pub rejected_zombie: usize,
    pub shape: GameShape,
    pub active_sources: usize,
    pub weighted_rounds: usize,
}

impl Diagnostics {
    pub fn total_rejected(&self) -> usize {
        self.rejected_user + self.rejected_sum + self.rejected_pattern + self.rejected_zombie
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "config {} | sources {} ({} rounds) | rejected: user {}, sum {}, pattern {}, zombie {}",
            self.shape,
            self.active_sources,
            self.weighted_rounds,
            self.rejected_user,
            self.rejected_sum,
            self.rejected_pattern,
            self.rejected_zombie
        )
    }
}

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub ranked: Vec<ScoredCandidate>,
    pub evolved_count: usize,
    pub shape: GameShape,
    pub diagnostics: Diagnostics,
}

enum Verdict {
    User,
    Sum,
    Pattern,
    Zombie,
    Kept(ScoredCandidate),
}

/// Filters, scores and ranks `request.candidates` against the weighted history, then tops
/// the ranking up with evolved children.
pub fn analyze(
    request: &AnalysisRequest,
    db: &RoundDatabase,
    config: &Config,
    rng: &mut Rng,
) -> AnalysisOutcome {
    let rounds = db.weighted_rounds();
    let active_sources = db.active_sources();
    let shape = db.shape(config);
    let strict = request.strict_filters;

    let verdicts: Vec<Verdict> = request
        .candidates
        .par_iter()
        .map(|candidate| {
            let numbers = &candidate.numbers;
            if !request.constraints.allows(numbers) {
                return Verdict::User;
            }
            if strict {
                if !passes_sum_band(numbers, shape, config) {
                    return Verdict::Sum;
                }
                if !passes_pattern(numbers, config) {
                    return Verdict::Pattern;
                }
            }

            let s = score(numbers, &rounds, shape, config);
            let zombie = s.coverage == 0
                && match config.zombie_rule {
                    ZombieRule::CoverageOnly => true,
                    ZombieRule::CoverageAndScore => s.total == 0.0,
                };
            if strict && active_sources > config.zombie_min_active_sources && zombie {
                return Verdict::Zombie;
            }

            Verdict::Kept(ScoredCandidate {
                candidate: candidate.clone(),
                score: s.total,
                tiers: s.tiers,
                coverage: s.coverage,
                active_sources,
                kind: request.kind,
                backtest: None,
            })
        })
        .collect();

    let mut diagnostics = Diagnostics {
        rejected_user: 0,
        rejected_sum: 0,
        rejected_pattern: 0,
        rejected_zombie: 0,
        shape,
        active_sources,
        weighted_rounds: rounds.len(),
    };
    let mut survivors = Vec::with_capacity(verdicts.len());
    for v in verdicts {
        match v {
            Verdict::User => diagnostics.rejected_user += 1,
            Verdict::Sum => diagnostics.rejected_sum += 1,
            Verdict::Pattern => diagnostics.rejected_pattern += 1,
            Verdict::Zombie => diagnostics.rejected_zombie += 1,
            Verdict::Kept(c) => survivors.push(c),
        }
    }
    sort_by_score_desc(&mut survivors);

    let habitat = Habitat {
        rounds: &rounds,
        shape,
        constraints: &request.constraints,
        strategy: request.strategy,
        active_sources,
    };
    let mut evolved = recombine(&survivors, request.evo_count, &habitat, config, rng);
    evolved.truncate(request.evo_count);
    let evolved_count = evolved.len();

    let raw_quota = request.top_n.saturating_sub(evolved_count);
    survivors.truncate(raw_quota);

    let mut ranked = evolved;
    ranked.extend(survivors);
    sort_by_score_desc(&mut ranked);

    if ranked.is_empty() && !request.candidates.is_empty() {
        warn!("[Analysis] Everything was filtered out: {}", diagnostics);
    } else {
        info!(
            "[Analysis] {} ranked ({} evolved) from {} candidates; {}",
            ranked.len(),
            evolved_count,
            request.candidates.len(),
            diagnostics
        );
    }

    AnalysisOutcome {
        ranked,
        evolved_count,
        shape,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Portfolio;
    use crate::types::Round;
    use std::collections::HashSet;

    // Rounds avoid 6, 13, 20, 27, 34 and 48.
    fn two_source_db() -> RoundDatabase {
        let s1 = [
            [1, 8, 15, 22, 29, 36],
            [2, 9, 16, 23, 30, 37],
            [3, 10, 17, 24, 31, 38],
            [4, 11, 18, 25, 32, 39],
            [5, 12, 19, 26, 33, 40],
        ];
        let s2 = [
            [7, 14, 21, 28, 35, 42],
            [1, 9, 17, 25, 33, 41],
            [2, 10, 18, 26, 43, 49],
            [3, 11, 19, 35, 44, 47],
            [4, 12, 21, 36, 45, 46],
        ];
        let mut db = RoundDatabase::new();
        db.set_source(1, s1.iter().map(|r| Round::new(r.iter().copied())).collect());
        db.set_source(2, s2.iter().map(|r| Round::new(r.iter().copied())).collect());
        db
    }

    fn request(candidates: Vec<Candidate>) -> AnalysisRequest {
        AnalysisRequest {
            candidates,
            evo_count: 0,
            ..AnalysisRequest::default()
        }
    }

    #[test]
    fn known_round_outranks_a_stranger() {
        let cfg = Config::default();
        let db = two_source_db();
        let hit = Candidate::new("HIT", [3, 10, 17, 24, 31, 38]);
        let miss = Candidate::new("MISS", [6, 13, 20, 27, 34, 48]);
        let mut rng = Rng::from_seed(1);

        let out = analyze(&request(vec![miss, hit]), &db, &cfg, &mut rng);

        assert_eq!(out.shape, GameShape { max_ball: 49, draw_length: 6 });
        assert_eq!(out.ranked.len(), 2);
        assert_eq!(out.ranked[0].id(), "HIT");
        assert_eq!(out.ranked[1].id(), "MISS");
        assert!(out.ranked[0].score > out.ranked[1].score);
        assert_eq!(out.ranked[0].coverage, 1);
        assert_eq!(out.ranked[1].score, 0.0);
        assert_eq!(out.ranked[0].coverage_label(), "1/2");
    }

    #[test]
    fn rejections_are_counted() {
        let cfg = Config::default();
        let db = two_source_db();
        let mut req = request(vec![
            Candidate::new("BL", [13, 20, 27, 34, 41, 48]),
            Candidate::new("LOWSUM", [1, 3, 5, 7, 9, 11]),
            Candidate::new("RUN", [10, 11, 12, 30, 40, 45]),
            Candidate::new("OK", [1, 8, 15, 22, 29, 36]),
        ]);
        req.constraints.blacklist.insert(13);
        let mut rng = Rng::from_seed(2);

        let out = analyze(&req, &db, &cfg, &mut rng);
        let d = out.diagnostics;
        assert_eq!((d.rejected_user, d.rejected_sum, d.rejected_pattern, d.rejected_zombie), (1, 1, 1, 0));
        assert_eq!(out.ranked.len(), 1);
        assert!(d.to_string().contains("config 6/49"));
    }

    #[test]
    fn relaxed_mode_skips_structural_filters() {
        let cfg = Config::default();
        let db = two_source_db();
        let mut req = request(vec![
            Candidate::new("LOWSUM", [1, 3, 5, 7, 9, 11]),
            Candidate::new("RUN", [10, 11, 12, 30, 40, 45]),
        ]);
        req.strict_filters = false;
        let mut rng = Rng::from_seed(3);
        let out = analyze(&req, &db, &cfg, &mut rng);
        assert_eq!(out.ranked.len(), 2);
        assert_eq!(out.diagnostics.total_rejected(), 0);
    }

    #[test]
    fn zombies_are_dropped_only_with_enough_sources() {
        let mut cfg = Config::default();
        let db = two_source_db();
        let req = request(vec![Candidate::new("MISS", [6, 13, 20, 27, 34, 48])]);
        let mut rng = Rng::from_seed(4);

        // Two active sources: not enough to judge.
        assert_eq!(analyze(&req, &db, &cfg, &mut rng).ranked.len(), 1);

        cfg.zombie_min_active_sources = 1;
        let out = analyze(&req, &db, &cfg, &mut rng);
        assert!(out.ranked.is_empty());
        assert_eq!(out.diagnostics.rejected_zombie, 1);
    }

    #[test]
    fn evolved_children_fill_their_quota_first() {
        let cfg = Config::default();
        let db = two_source_db();
        let candidates = vec![
            Candidate::new("A", [1, 8, 15, 22, 29, 36]),
            Candidate::new("B", [2, 9, 16, 23, 30, 37]),
            Candidate::new("C", [3, 10, 17, 24, 31, 38]),
            Candidate::new("D", [7, 14, 21, 28, 35, 42]),
            Candidate::new("E", [1, 9, 17, 25, 33, 41]),
        ];
        let req = AnalysisRequest {
            candidates,
            top_n: 4,
            evo_count: 2,
            ..AnalysisRequest::default()
        };
        let mut rng = Rng::from_seed(10);
        let out = analyze(&req, &db, &cfg, &mut rng);

        assert!(out.evolved_count <= 2);
        // Raw survivors only fill what the children leave of top_n.
        assert_eq!(out.ranked.len(), 4);
        let evolved = out.ranked.iter().filter(|c| c.kind == CandidateKind::Evolved).count();
        assert_eq!(evolved, out.evolved_count);
        for w in out.ranked.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
    }

    #[test]
    fn evolved_batches_from_separate_runs_can_both_be_admitted() {
        let cfg = Config::default();
        let db = two_source_db();
        let candidates = vec![
            Candidate::new("A", [1, 8, 15, 22, 29, 36]),
            Candidate::new("B", [2, 9, 16, 23, 30, 37]),
            Candidate::new("C", [3, 10, 17, 24, 31, 38]),
            Candidate::new("D", [7, 14, 21, 28, 35, 42]),
            Candidate::new("E", [1, 9, 17, 25, 33, 41]),
        ];
        let req = AnalysisRequest {
            candidates,
            top_n: 5,
            evo_count: 5,
            ..AnalysisRequest::default()
        };
        let first = analyze(&req, &db, &cfg, &mut Rng::from_seed(1));
        let second = analyze(&req, &db, &cfg, &mut Rng::from_seed(999));
        assert!(second.evolved_count > 0);

        let mut portfolio = Portfolio::new();
        let report = portfolio.admit_batch(&first.ranked, 1.0, &cfg);
        assert_eq!(report.added, first.ranked.len());

        let seen: HashSet<&[u32]> = first.ranked.iter().map(|c| c.numbers()).collect();
        let repeats = second.ranked.iter().filter(|c| seen.contains(c.numbers())).count();
        let report = portfolio.admit_batch(&second.ranked, 1.0, &cfg);
        // Only selections already held by number are skipped, never fresh ones by id.
        assert_eq!(report.skipped_duplicate, repeats);
        assert_eq!(report.added, second.ranked.len() - repeats);
    }
}
