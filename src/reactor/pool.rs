//! Bounded worker pool
//!
//! A fixed set of worker threads fed from a bounded queue. When the queue is
//! full, a submission either blocks until space frees up or is refused,
//! depending on the [`Admission`] policy. Jobs are never dropped silently.

use super::{Error, Result};
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, error};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// What happens when the queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Admission {
    /// Wait for queue space
    #[default]
    Block,
    /// Refuse the job
    Reject,
}

/// Fixed-size thread pool with a bounded queue
pub struct ThreadPool {
    sender: Option<SyncSender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl ThreadPool {
    /// Start `workers` threads sharing a queue of `queue_capacity` jobs
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Argument("thread pool needs at least one worker".into()));
        }

        let (sender, receiver) = mpsc::sync_channel::<Job>(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));

        let mut handles = Vec::with_capacity(workers);
        for n in 0..workers {
            let receiver = Arc::clone(&receiver);
            let handle = thread::Builder::new()
                .name(format!("pool-worker-{}", n))
                .spawn(move || worker_loop(receiver))
                .map_err(Error::Spawn)?;
            handles.push(handle);
        }
        debug!(workers, queue_capacity, "thread pool started");

        Ok(ThreadPool {
            sender: Some(sender),
            workers: handles,
            queue_capacity,
        })
    }

    /// Queue a job, waiting while the queue is full
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.sender()?
            .send(Box::new(job))
            .map_err(|_| Error::Rejected("thread pool is shut down".into()))
    }

    /// Queue a job, refusing it if the queue is full
    pub fn try_execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match self.sender()?.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(Error::Rejected(format!(
                "thread pool queue is full ({} pending)",
                self.queue_capacity
            ))),
            Err(TrySendError::Disconnected(_)) => {
                Err(Error::Rejected("thread pool is shut down".into()))
            }
        }
    }

    /// Submit under the given admission policy
    pub fn submit<F>(&self, admission: Admission, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match admission {
            Admission::Block => self.execute(job),
            Admission::Reject => self.try_execute(job),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    fn sender(&self) -> Result<&SyncSender<Job>> {
        self.sender
            .as_ref()
            .ok_or_else(|| Error::Rejected("thread pool is shut down".into()))
    }
}

impl Drop for ThreadPool {
    /// Let queued jobs finish, then join the workers
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("pool worker exited abnormally");
            }
        }
    }
}

fn worker_loop(receiver: Arc<Mutex<Receiver<Job>>>) {
    loop {
        // the guard is released before the job runs
        let next = receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv();

        let Ok(job) = next else {
            break;
        };
        if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
            error!("job panicked on {:?}", thread::current().name());
        }
    }
}
