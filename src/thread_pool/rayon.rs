use super::ThreadPool;
use crate::error::{KvGateError, Result};

/// Adapter for the rayon thread pool crate.
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    /// Return new thread pool.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("kvgate-rayon-{}", i))
            .build()
            .map_err(|c| KvGateError::ThreadPoolBuild { c })?;

        Ok(RayonThreadPool { pool })
    }

    /// Spawn the given job on the thread pool.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}
