//! Evaluation settings carried by every stream.

use std::fmt;
use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::Result;

/// How a stream's terminal operation is evaluated.
///
/// The default is sequential evaluation; in parallel mode,
/// order-insensitive terminal operations run on rayon's global pool, or on
/// a dedicated pool when one is configured.
///
/// # Examples
/// ```
/// use u_numstream::{NumStream, StreamConfig};
/// let config = StreamConfig::new().parallel(true).with_threads(2).unwrap();
/// let total = NumStream::range(0, 1000).with_config(config).sum().unwrap();
/// assert_eq!(total, 499_500_i64);
/// ```
#[derive(Clone, Default)]
pub struct StreamConfig {
    parallel: bool,
    pool: Option<Arc<ThreadPool>>,
}

impl StreamConfig {
    /// Sequential evaluation on the global pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the evaluation mode.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Runs parallel evaluation inside `pool` instead of the global pool.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Builds a dedicated pool with `threads` workers.
    pub fn with_threads(self, threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("numstream-{i}"))
            .build()?;
        debug!(threads, "built dedicated stream pool");
        Ok(self.with_pool(Arc::new(pool)))
    }

    /// Whether parallel evaluation is enabled.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub(crate) fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }

    pub(crate) fn install<R, F>(&self, job: F) -> R
    where
        R: Send,
        F: FnOnce() -> R + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(job),
            None => job(),
        }
    }
}

impl fmt::Debug for StreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConfig")
            .field("parallel", &self.parallel)
            .field(
                "pool_threads",
                &self.pool.as_ref().map(|p| p.current_num_threads()),
            )
            .finish()
    }
}
