use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use loto_architect::detect::exposure_limit;
use loto_architect::ingest::{number_frequencies, parse_number_set};
use loto_architect::report::{
    export_text, render_admission, render_backtest, render_heatmap, render_portfolio, render_ranking,
};
use loto_architect::{
    analyze, backtest, generate, parse_candidates, parse_rounds, AnalysisOutcome, AnalysisRequest,
    AnalysisWorker, CandidateKind, Config, GenerationPlan, Rng, Snapshot, Strategy,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "data/config.json")]
    config: String,

    /// Random seed (optional)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Session snapshot (`.bin` for bincode, anything else JSON)
    #[arg(long, default_value = "data/state.json")]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Clone)]
struct RankingOpts {
    /// Ranked results to keep
    #[arg(short = 'n', long, default_value_t = 100)]
    top: usize,
    /// Evolved children to add
    #[arg(short, long, default_value_t = 15)]
    evo: usize,
    /// Skip the sum-band, pattern and zombie filters
    #[arg(long)]
    relaxed: bool,
    /// Strategy used when evolution regenerates (balanced|frequency)
    #[arg(long, default_value_t = Strategy::Balanced)]
    strategy: Strategy,
    /// Admit the ranking into the portfolio
    #[arg(long)]
    admit: bool,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Replace one source's rounds with the lines of a text file
    Import {
        /// Source number (1..=13); later sources weigh more
        source: u8,
        file: PathBuf,
    },
    /// Show or edit the blacklist/whitelist
    Rules {
        #[arg(long)]
        blacklist: Option<String>,
        #[arg(long)]
        whitelist: Option<String>,
        /// Drop both lists
        #[arg(long)]
        clear: bool,
    },
    /// Frequency of every number across unique rounds
    Heatmap,
    /// Synthesize selections and rank them
    Generate {
        #[arg(short, long, default_value_t = 50)]
        count: usize,
        /// Numbers per selection (default: detected draw length)
        #[arg(short, long)]
        length: Option<usize>,
        #[command(flatten)]
        ranking: RankingOpts,
    },
    /// Rank `id, numbers` lines from a text file
    Analyze {
        file: PathBuf,
        #[command(flatten)]
        ranking: RankingOpts,
    },
    /// List the portfolio with per-number exposure
    Portfolio,
    /// Drop near-duplicate portfolio entries
    Reduce,
    /// Remove one portfolio entry by id
    Remove { id: String },
    /// Empty the portfolio
    Clear,
    /// Write the portfolio as text lines
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replay the portfolio against rounds from a text file
    Backtest { file: PathBuf },
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading '{}'", path.display()))
}

fn run_ranking(
    request: AnalysisRequest,
    snapshot: &Snapshot,
    config: &Config,
    worker: &AnalysisWorker,
    rng: &mut Rng,
) -> Result<AnalysisOutcome> {
    worker.execute(|| analyze(&request, &snapshot.round_database, config, rng))
}

fn finish_ranking(outcome: &AnalysisOutcome, admit: bool, snapshot: &mut Snapshot, config: &Config) -> bool {
    print!("{}", render_ranking(outcome));
    if !admit {
        return false;
    }
    let limit = exposure_limit(outcome.shape, config);
    let report = snapshot.portfolio.admit_batch(&outcome.ranked, limit, config);
    print!("{}", render_admission(&report));
    report.added > 0
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let mut rng = match args.seed {
        Some(seed) => {
            info!("[System] Seed {}", seed);
            Rng::from_seed(seed)
        }
        None => Rng::new(),
    };
    let mut snapshot = Snapshot::load_or_default(&args.state)?;

    let dirty = match args.command {
        Commands::Import { source, file } => {
            let (rounds, report) = parse_rounds(&read_text(&file)?);
            if report.skipped > 0 {
                warn!("[Import] Skipped {} malformed lines in {}", report.skipped, file.display());
            }
            anyhow::ensure!(
                snapshot.round_database.set_source(source, rounds),
                "source must be within 1..=13, got {}",
                source
            );
            let removed = snapshot.round_database.dedup();
            let shape = snapshot.round_database.shape(&config);
            println!(
                "Source {}: {} rounds accepted, {} duplicates removed. Game {} across {} sources.",
                source,
                report.accepted,
                removed,
                shape,
                snapshot.round_database.active_sources()
            );
            true
        }
        Commands::Rules { blacklist, whitelist, clear } => {
            let constraints = &mut snapshot.constraints;
            if clear {
                constraints.blacklist.clear();
                constraints.whitelist.clear();
            }
            if let Some(text) = &blacklist {
                constraints.blacklist = parse_number_set(text);
            }
            if let Some(text) = &whitelist {
                constraints.whitelist = parse_number_set(text);
            }
            println!("blacklist: {:?}", constraints.blacklist);
            println!("whitelist: {:?}", constraints.whitelist);
            clear || blacklist.is_some() || whitelist.is_some()
        }
        Commands::Heatmap => {
            let db = &snapshot.round_database;
            let shape = db.shape(&config);
            print!("{}", render_heatmap(&number_frequencies(db.unique_rounds(), shape.max_ball)));
            false
        }
        Commands::Generate { count, length, ranking } => {
            let worker = AnalysisWorker::new_with_config(&config)?;
            let shape = snapshot.round_database.shape(&config);
            let plan = GenerationPlan {
                max_ball: shape.max_ball,
                length: length.unwrap_or(shape.draw_length),
                count,
                strategy: ranking.strategy,
                whitelist: &snapshot.constraints.whitelist,
                id_prefix: "GEN",
            };
            let rounds = snapshot.round_database.weighted_rounds();
            let candidates = generate(&rounds, &plan, &config, &mut rng);
            let request = AnalysisRequest {
                candidates,
                kind: CandidateKind::Generated,
                top_n: ranking.top,
                evo_count: ranking.evo,
                strict_filters: !ranking.relaxed,
                constraints: snapshot.constraints.clone(),
                strategy: ranking.strategy,
            };
            let outcome = run_ranking(request, &snapshot, &config, &worker, &mut rng)?;
            finish_ranking(&outcome, ranking.admit, &mut snapshot, &config)
        }
        Commands::Analyze { file, ranking } => {
            let worker = AnalysisWorker::new_with_config(&config)?;
            let (candidates, report) = parse_candidates(&read_text(&file)?, "MAN");
            if report.skipped > 0 {
                warn!("[Analyze] Skipped {} malformed lines in {}", report.skipped, file.display());
            }
            let request = AnalysisRequest {
                candidates,
                kind: CandidateKind::Raw,
                top_n: ranking.top,
                evo_count: ranking.evo,
                strict_filters: !ranking.relaxed,
                constraints: snapshot.constraints.clone(),
                strategy: ranking.strategy,
            };
            let outcome = run_ranking(request, &snapshot, &config, &worker, &mut rng)?;
            finish_ranking(&outcome, ranking.admit, &mut snapshot, &config)
        }
        Commands::Portfolio => {
            let limit = exposure_limit(snapshot.round_database.shape(&config), &config);
            print!("{}", render_portfolio(&snapshot.portfolio, limit));
            false
        }
        Commands::Reduce => {
            let removed = snapshot.portfolio.reduce();
            println!("Removed {} near-duplicates, {} remain.", removed, snapshot.portfolio.len());
            removed > 0
        }
        Commands::Remove { id } => {
            let removed = snapshot.portfolio.remove(&id);
            if !removed {
                warn!("[Portfolio] No entry with id '{}'", id);
            }
            removed
        }
        Commands::Clear => {
            let n = snapshot.portfolio.clear();
            println!("Cleared {} entries.", n);
            n > 0
        }
        Commands::Export { output } => {
            let text = export_text(&snapshot.portfolio);
            match output {
                Some(path) => {
                    fs::write(&path, &text).with_context(|| format!("writing '{}'", path.display()))?;
                    println!("Exported {} entries to {}", snapshot.portfolio.len(), path.display());
                }
                None => print!("{}", text),
            }
            false
        }
        Commands::Backtest { file } => {
            let worker = AnalysisWorker::new_with_config(&config)?;
            let (rounds, report) = parse_rounds(&read_text(&file)?);
            if report.skipped > 0 {
                warn!("[Backtest] Skipped {} malformed lines in {}", report.skipped, file.display());
            }
            let (stats, results) = worker.execute(|| backtest(snapshot.portfolio.entries(), &rounds, &config))?;
            print!("{}", render_backtest(&stats, &results));
            snapshot.portfolio.apply_backtest(&results) > 0
        }
    };

    if dirty {
        if let Some(dir) = args.state.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).with_context(|| format!("creating '{}'", dir.display()))?;
        }
        snapshot.save(&args.state)?;
    }
    Ok(())
}
