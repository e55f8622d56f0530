//! loto-architect - weighted-history selection engine
//!
//! Scores candidate number selections against rounds drawn from up to 13 weighted sources,
//! filters out structurally implausible ones, breeds new candidates and keeps an
//! exposure-balanced portfolio of the accepted ones.
//!
//! # Architecture
//!
//! ```text
//! Rounds → Detect → User filter → Sum/Pattern → Score → Zombie → Recombine → Ranking
//!                                                                              ↓
//!                          Backtest ← Reduce ← Exposure guard ← Portfolio admission
//! ```
//!
//! Everything from detection to backtesting is a plain function over explicit inputs.
//! Session state (rounds, portfolio, constraints) lives in [`Snapshot`] and is owned by the
//! caller.

pub mod backtest;
pub mod config;
pub mod detect;
pub mod filters;
pub mod generator;
pub mod ingest;
pub mod pipeline;
pub mod portfolio;
pub mod recombine;
pub mod report;
pub mod rng;
pub mod scorer;
pub mod snapshot;
pub mod types;
pub mod worker;

pub use backtest::{backtest, BacktestResult, BacktestStats};
pub use config::Config;
pub use detect::{detect, exposure_limit};
pub use filters::{passes_pattern, passes_user_constraints, UserConstraints};
pub use generator::{generate, GenerationPlan, Strategy};
pub use ingest::{parse_candidates, parse_rounds, RoundDatabase};
pub use pipeline::{analyze, AnalysisOutcome, AnalysisRequest, Diagnostics};
pub use portfolio::{can_admit, reduce, AdmissionReport, Portfolio};
pub use rng::Rng;
pub use scorer::score;
pub use snapshot::Snapshot;
pub use types::{Candidate, CandidateKind, GameShape, Label, Round, ScoredCandidate, WeightedRound};
pub use worker::AnalysisWorker;
