use std::num::NonZeroUsize;

use clap::Parser;

use crate::prelude::*;

#[must_use]
#[derive(Parser)]
pub struct WorkerArgs {
    /// Maximum number of windows solved at the same time, the available parallelism by default.
    #[clap(long = "workers", env = "WORKERS")]
    pub workers: Option<NonZeroUsize>,
}

impl WorkerArgs {
    /// Configure the global worker pool, must be called once before any solving.
    pub fn init_pool(&self) -> Result {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(workers) = self.workers {
            builder = builder.num_threads(workers.get());
        }
        builder.build_global().context("failed to build the worker pool")?;
        info!(n_workers = rayon::current_num_threads(), "Configured the worker pool");
        Ok(())
    }
}
