use std::thread;

use log::debug;

use super::ThreadPool;
use crate::error::Result;

/// Spawns a fresh thread for every job.
pub struct NaiveThreadPool {}

impl ThreadPool for NaiveThreadPool {
    fn new(_threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        Ok(NaiveThreadPool {})
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        debug!("spawning a new thread");
        thread::spawn(job);
    }
}
