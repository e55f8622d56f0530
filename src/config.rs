use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// What disqualifies a strictly-filtered candidate as "zombie" noise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZombieRule {
    /// No source coverage at all.
    CoverageOnly,
    /// No source coverage and no score (structural credit included).
    CoverageAndScore,
}

/// How the genetic step produces children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecombinationMode {
    Crossover,
    Regenerate,
}

// --- Configuration (Data-Driven) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub default_max_ball: u32,
    pub default_draw_length: usize,

    pub exposure_multiplier: f64,
    pub exposure_floor: f64,
    pub exposure_ceiling: f64,
    pub exposure_grace_period: usize,

    pub sum_band_low: f64,
    pub sum_band_high: f64,
    pub reject_consecutive_runs: bool,
    pub reject_decade_cluster: bool,
    pub reject_uniform_parity: bool,

    pub balance_bonus: f64,
    pub spread_bonus: f64,
    pub spread_fraction: f64,

    pub zombie_min_active_sources: usize,
    pub zombie_rule: ZombieRule,

    pub attempts_per_result: usize,
    pub frequency_oversample: usize,
    pub frequency_repeat_scale: f64,

    pub recombination_mode: RecombinationMode,
    pub parent_pool_size: usize,
    pub mutation_rate: f64,

    pub silver_min_hits: u32,

    pub worker_max_threads: usize,
    pub worker_reserve_cores: usize,
    pub worker_stack_size_mb: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_max_ball: 49,
            default_draw_length: 6,
            exposure_multiplier: 1.8,
            exposure_floor: 0.15,
            exposure_ceiling: 0.60,
            exposure_grace_period: 30,
            sum_band_low: 0.35,
            sum_band_high: 1.65,
            reject_consecutive_runs: true,
            reject_decade_cluster: false,
            reject_uniform_parity: false,
            balance_bonus: 40.0,
            spread_bonus: 30.0,
            spread_fraction: 0.5,
            zombie_min_active_sources: 5,
            zombie_rule: ZombieRule::CoverageAndScore,
            attempts_per_result: 40,
            frequency_oversample: 5,
            frequency_repeat_scale: 10.0,
            recombination_mode: RecombinationMode::Crossover,
            parent_pool_size: 40,
            mutation_rate: 0.15,
            silver_min_hits: 5,
            worker_max_threads: 0,
            worker_reserve_cores: 1,
            worker_stack_size_mb: 4,
        }
    }
}

impl Config {
    /// Loads `path`, falling back to `../../path` (binary run from `target/<profile>`).
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load(path: &str) -> Result<Self> {
        let candidates = [path.to_string(), format!("../../{}", path)];
        let found = candidates.iter().find(|p| Path::new(p.as_str()).is_file());

        let Some(found) = found else {
            warn!("[Config] '{}' not found, using built-in defaults", path);
            return Ok(Config::default());
        };

        let contents =
            fs::read_to_string(found).with_context(|| format!("reading config '{}'", found))?;
        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing config '{}'", found))?;
        config.validate()?;
        info!("[Config] Loaded {}", found);
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.exposure_floor > 0.0 && self.exposure_floor <= self.exposure_ceiling,
            "exposure_floor must be in (0, exposure_ceiling]"
        );
        anyhow::ensure!(
            self.exposure_ceiling <= 1.0,
            "exposure_ceiling must not exceed 1.0"
        );
        anyhow::ensure!(
            self.sum_band_low < self.sum_band_high,
            "sum_band_low must be below sum_band_high"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.mutation_rate),
            "mutation_rate must be within [0, 1]"
        );
        anyhow::ensure!(
            self.attempts_per_result >= 1,
            "attempts_per_result must be >= 1"
        );
        anyhow::ensure!(self.parent_pool_size >= 2, "parent_pool_size must be >= 2");
        anyhow::ensure!(self.default_max_ball > 0, "default_max_ball must be > 0");
        Ok(())
    }
}
