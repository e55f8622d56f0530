use crate::config::{Config, RecombinationMode};
use crate::filters::{passes_pattern, UserConstraints};
use crate::generator::{fresh_id, generate, GenerationPlan, Strategy};
use crate::rng::Rng;
use crate::scorer::score;
use crate::types::{sort_by_score_desc, Candidate, CandidateKind, GameShape, ScoredCandidate, WeightedRound};
use log::debug;
use rand::seq::index;
use std::collections::{BTreeSet, HashSet};

/// Shared inputs of one genetic step.
#[derive(Debug, Clone, Copy)]
pub struct Habitat<'a> {
    pub rounds: &'a [WeightedRound],
    pub shape: GameShape,
    pub constraints: &'a UserConstraints,
    pub strategy: Strategy,
    pub active_sources: usize,
}

/// Produces up to `target` evolved children from `ranked` (best first).
///
/// Crossover needs at least two parents; with fewer it regenerates instead.
pub fn recombine(
    ranked: &[ScoredCandidate],
    target: usize,
    habitat: &Habitat<'_>,
    config: &Config,
    rng: &mut Rng,
) -> Vec<ScoredCandidate> {
    let Some(best) = ranked.first() else {
        return Vec::new();
    };
    if target == 0 {
        return Vec::new();
    }
    let length = best.numbers().len();

    let mut children = match config.recombination_mode {
        RecombinationMode::Crossover if ranked.len().min(config.parent_pool_size) >= 2 => crossover(ranked, length, target, habitat, config, rng),
        _ => regenerate(length, target, habitat, config, rng),
    };

    sort_by_score_desc(&mut children);
    children.truncate(target);
    debug!("[Genetic] {} children (target {})", children.len(), target);
    children
}

fn crossover(
    ranked: &[ScoredCandidate],
    length: usize,
    target: usize,
    habitat: &Habitat<'_>,
    config: &Config,
    rng: &mut Rng,
) -> Vec<ScoredCandidate> {
    let pool = &ranked[..ranked.len().min(config.parent_pool_size)];
    let parents: HashSet<&[u32]> = pool.iter().map(|p| p.numbers()).collect();

    // Twice the quota competes; the best `target` survive.
    let brood = target * 2;
    let max_attempts = target * config.attempts_per_result;
    let mut seen: HashSet<Vec<u32>> = HashSet::new();
    let mut ids: HashSet<String> = HashSet::new();
    let mut children = Vec::with_capacity(brood);
    let mut attempts = 0;

    while children.len() < brood && attempts < max_attempts {
        attempts += 1;

        let pair = index::sample(rng, pool.len(), 2);
        let (a, b) = (&pool[pair.index(0)], &pool[pair.index(1)]);
        let genes: Vec<u32> = a
            .numbers()
            .iter()
            .chain(b.numbers())
            .copied()
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .collect();
        if genes.len() < length {
            continue;
        }

        let mut child: Vec<u32> = index::sample(rng, genes.len(), length)
            .into_iter()
            .map(|i| genes[i])
            .collect();

        if rng.chance(config.mutation_rate) {
            let slot = rng.next_u64_bounded(length as u64) as usize;
            if let Some(n) = rng.ball_in(1, habitat.shape.max_ball) {
                child[slot] = n;
            }
        }

        child.sort_unstable();
        child.dedup();
        if child.len() != length
            || !passes_pattern(&child, config)
            || !habitat.constraints.allows(&child)
            || parents.contains(child.as_slice())
            || !seen.insert(child.clone())
        {
            continue;
        }

        let s = score(&child, habitat.rounds, habitat.shape, config);
        if s.total <= 0.0 {
            continue;
        }

        let id = fresh_id("EVO", &mut ids, rng);
        children.push(ScoredCandidate {
            candidate: Candidate { id, numbers: child },
            score: s.total,
            tiers: s.tiers,
            coverage: s.coverage,
            active_sources: habitat.active_sources,
            kind: CandidateKind::Evolved,
            backtest: None,
        });
    }
    children
}

fn regenerate(
    length: usize,
    target: usize,
    habitat: &Habitat<'_>,
    config: &Config,
    rng: &mut Rng,
) -> Vec<ScoredCandidate> {
    let plan = GenerationPlan {
        max_ball: habitat.shape.max_ball,
        length,
        count: target,
        strategy: habitat.strategy,
        whitelist: &habitat.constraints.whitelist,
        id_prefix: "EVO",
    };
    generate(habitat.rounds, &plan, config, rng)
        .into_iter()
        .filter(|c| habitat.constraints.allows(&c.numbers))
        .map(|candidate| {
            let s = score(&candidate.numbers, habitat.rounds, habitat.shape, config);
            ScoredCandidate {
                candidate,
                score: s.total,
                tiers: s.tiers,
                coverage: s.coverage,
                active_sources: habitat.active_sources,
                kind: CandidateKind::Evolved,
                backtest: None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{source_weight, TierCounts};

    fn history() -> Vec<WeightedRound> {
        let raw: [[u32; 6]; 5] = [
            [3, 9, 17, 25, 33, 41],
            [5, 9, 21, 25, 38, 47],
            [2, 9, 14, 25, 30, 44],
            [7, 12, 19, 28, 36, 45],
            [4, 15, 22, 29, 37, 46],
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

    fn parent(id: &str, numbers: &[u32], score: f64) -> ScoredCandidate {
        ScoredCandidate {
            candidate: Candidate::new(id, numbers.iter().copied()),
            score,
            tiers: TierCounts::default(),
            coverage: 1,
            active_sources: 5,
            kind: CandidateKind::Raw,
            backtest: None,
        }
    }

    fn parents() -> Vec<ScoredCandidate> {
        vec![
            parent("A", &[3, 9, 17, 25, 36, 45], 400.0),
            parent("B", &[5, 9, 21, 28, 38, 47], 300.0),
            parent("C", &[2, 14, 25, 30, 41, 44], 200.0),
        ]
    }

    #[test]
    fn crossover_children_are_valid_and_scored() {
        let cfg = Config::default();
        let rounds = history();
        let constraints = UserConstraints::default();
        let habitat = Habitat {
            rounds: &rounds,
            shape: GameShape { max_ball: 49, draw_length: 6 },
            constraints: &constraints,
            strategy: Strategy::Balanced,
            active_sources: 5,
        };
        let mut rng = Rng::from_seed(4);
        let kids = recombine(&parents(), 5, &habitat, &cfg, &mut rng);

        assert!(!kids.is_empty() && kids.len() <= 5);
        let parent_sets: Vec<Vec<u32>> = parents().iter().map(|p| p.numbers().to_vec()).collect();
        for w in kids.windows(2) {
            assert!(w[0].score >= w[1].score);
        }
        for k in &kids {
            assert_eq!(k.kind, CandidateKind::Evolved);
            assert_eq!(k.numbers().len(), 6);
            assert!(k.score > 0.0);
            assert!(!parent_sets.contains(&k.numbers().to_vec()));
        }
    }

    #[test]
    fn children_respect_the_blacklist() {
        let cfg = Config::default();
        let rounds = history();
        let constraints = UserConstraints {
            blacklist: [9, 25].into_iter().collect(),
            whitelist: BTreeSet::new(),
        };
        let habitat = Habitat {
            rounds: &rounds,
            shape: GameShape { max_ball: 49, draw_length: 6 },
            constraints: &constraints,
            strategy: Strategy::Balanced,
            active_sources: 5,
        };
        let mut rng = Rng::from_seed(9);
        for k in recombine(&parents(), 8, &habitat, &cfg, &mut rng) {
            assert!(!k.numbers().contains(&9) && !k.numbers().contains(&25));
        }
    }

    #[test]
    fn single_parent_falls_back_to_regeneration() {
        let cfg = Config::default();
        let rounds = history();
        let constraints = UserConstraints::default();
        let habitat = Habitat {
            rounds: &rounds,
            shape: GameShape { max_ball: 49, draw_length: 6 },
            constraints: &constraints,
            strategy: Strategy::Balanced,
            active_sources: 5,
        };
        let mut rng = Rng::from_seed(12);
        let only = vec![parent("A", &[3, 9, 17, 25, 36, 45], 400.0)];
        let kids = recombine(&only, 6, &habitat, &cfg, &mut rng);
        assert_eq!(kids.len(), 6);
        assert!(kids.iter().all(|k| k.kind == CandidateKind::Evolved && k.id().starts_with("EVO_")));
    }

    #[test]
    fn empty_input_or_zero_target_yields_nothing() {
        let cfg = Config::default();
        let constraints = UserConstraints::default();
        let habitat = Habitat {
            rounds: &[],
            shape: GameShape { max_ball: 49, draw_length: 6 },
            constraints: &constraints,
            strategy: Strategy::Balanced,
            active_sources: 0,
        };
        let mut rng = Rng::from_seed(1);
        assert!(recombine(&[], 5, &habitat, &cfg, &mut rng).is_empty());
        assert!(recombine(&parents(), 0, &habitat, &cfg, &mut rng).is_empty());
    }
}
