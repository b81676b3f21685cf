use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RuntimeConfig {
    /// Worker threads for fitting; 0 uses one per logical core
    pub threads: usize,
}

impl RuntimeConfig {
    pub fn with_threads(threads: usize) -> Self {
        Self { threads }
    }
}

pub fn create_thread_pool(config: &RuntimeConfig) -> Result<ThreadPool> {
    let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("fit-worker-{}", i));

    // Configure threading
    if config.threads > 0 {
        builder = builder.num_threads(config.threads);
    }

    let pool = builder.build()?;
    log::debug!("Thread pool ready with {} workers", pool.current_num_threads());
    Ok(pool)
}
