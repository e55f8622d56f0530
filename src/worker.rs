use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use log::{error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Dedicated rayon pool for analysis and backtest batches. Parallel iterators inside
/// `execute` run on this pool rather than the global one.
pub struct AnalysisWorker {
    pool: Arc<ThreadPool>,
    num_threads: usize,
}

impl AnalysisWorker {
    pub fn new_with_config(config: &Config) -> Result<Self> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let mut num_threads = if cores > config.worker_reserve_cores {
            cores - config.worker_reserve_cores
        } else {
            1
        };
        if config.worker_max_threads > 0 && num_threads > config.worker_max_threads {
            num_threads = config.worker_max_threads;
        }
        let stack_size = if config.worker_stack_size_mb == 0 {
            4 * 1024 * 1024
        } else {
            config.worker_stack_size_mb * 1024 * 1024
        };
        Self::build_pool(num_threads, stack_size)
    }

    fn build_pool(num_threads: usize, stack_size: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("analysis-{}", i))
            .stack_size(stack_size)
            .panic_handler(|err| {
                error!("[Worker] Thread panicked: {:?}", err);
            })
            .build()
            .context("building analysis pool")?;

        info!("[Worker] Initialized with {} threads", num_threads);

        Ok(Self {
            pool: Arc::new(pool),
            num_threads,
        })
    }

    /// Runs `f` on the pool; a panic inside it comes back as an error.
    pub fn execute<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let result = self
            .pool
            .install(|| panic::catch_unwind(AssertUnwindSafe(f)));

        result.map_err(|err| {
            if let Some(s) = err.downcast_ref::<&str>() {
                anyhow!("analysis task panicked: {}", s)
            } else if let Some(s) = err.downcast_ref::<String>() {
                anyhow!("analysis task panicked: {}", s)
            } else {
                anyhow!("analysis task panicked with unknown error")
            }
        })
    }

    pub fn thread_count(&self) -> usize {
        self.num_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    fn small() -> AnalysisWorker {
        let cfg = Config {
            worker_max_threads: 2,
            ..Config::default()
        };
        AnalysisWorker::new_with_config(&cfg).unwrap()
    }

    #[test]
    fn thread_cap_is_honoured() {
        let worker = small();
        assert!(worker.thread_count() >= 1 && worker.thread_count() <= 2);
        let threads = worker.execute(rayon::current_num_threads).unwrap();
        assert_eq!(threads, worker.thread_count());
    }

    #[test]
    fn parallel_work_runs_on_the_pool() {
        let worker = small();
        let sum: u64 = worker.execute(|| (1..=1000u64).into_par_iter().sum()).unwrap();
        assert_eq!(sum, 500_500);
    }

    #[test]
    fn panics_become_errors() {
        let worker = small();
        let err = worker.execute(|| -> u32 { panic!("boom") }).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
