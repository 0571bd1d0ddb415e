use log::{error, warn};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use super::ThreadPool;
use crate::error::Result;

/// A fixed set of workers pulling jobs off one shared queue.
///
/// A panicking job is logged and the worker keeps going. Dropping the pool
/// lets queued jobs finish and joins every worker.
pub struct SharedQueueThreadPool {
    tx: Option<Sender<Job>>,
    handles: Vec<thread::JoinHandle<()>>,
}

type Job = Box<dyn FnOnce() + Send + 'static>;

impl ThreadPool for SharedQueueThreadPool {
    /// Return new thread pool.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        let (tx, rx) = channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut handles = vec![];

        for i in 0..threads {
            let rx = rx.clone();

            let handle = thread::Builder::new()
                .name(format!("kvgate-worker-{}", i))
                .spawn(move || run_worker(&rx))?;
            handles.push(handle);
        }

        Ok(SharedQueueThreadPool {
            tx: Some(tx),
            handles,
        })
    }

    /// Spawn the given job on the thread pool.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let sent = match &self.tx {
            Some(tx) => tx.send(Box::new(job)).is_ok(),
            None => false,
        };
        if !sent {
            error!("thread pool is shut down, dropping job");
        }
    }
}

fn run_worker(rx: &Mutex<Receiver<Job>>) {
    loop {
        let job = rx.lock().recv();

        match job {
            Ok(job) => {
                if let Err(e) = panic::catch_unwind(AssertUnwindSafe(job)) {
                    error!("job panicked: {:?}", e);
                }
            }
            // Sender was dropped, thereby closing the thread.
            Err(_) => return,
        }
    }
}

impl Drop for SharedQueueThreadPool {
    fn drop(&mut self) {
        drop(self.tx.take());

        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("worker thread exited with a panic");
            }
        }
    }
}
