use crate::error::{KvGateError, Result};

mod naive;
mod rayon;
mod shared;

pub use self::naive::NaiveThreadPool;
pub use self::rayon::RayonThreadPool;
pub use self::shared::SharedQueueThreadPool;

/// An abstraction of a thread pool.
pub trait ThreadPool {
    /// Return new thread pool.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;
    /// Spawn the given job on the thread pool.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

/// Pool implementation selectable at startup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PoolKind {
    /// `SharedQueueThreadPool`
    Shared,
    /// `RayonThreadPool`
    Rayon,
    /// `NaiveThreadPool`
    Naive,
}

impl std::str::FromStr for PoolKind {
    type Err = KvGateError;

    fn from_str(s: &str) -> Result<PoolKind> {
        match s {
            "shared" => Ok(PoolKind::Shared),
            "rayon" => Ok(PoolKind::Rayon),
            "naive" => Ok(PoolKind::Naive),
            _ => Err(KvGateError::InvalidConfig {
                name: "pool",
                value: s.to_owned(),
            }),
        }
    }
}
