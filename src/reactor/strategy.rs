//! Creation and concurrency strategies
//!
//! The acceptor does not know how handlers are built or where they run. It
//! asks a [`StrategyFactory`] for a [`CreationStrategy`], which builds and
//! opens a handler for a new connection, and a [`ConcurrencyStrategy`],
//! which decides on which thread `run()` happens.

use super::handle::SocketHandle;
use super::pool::{Admission, ThreadPool};
use super::service::ServiceHandler;
use super::{Error, Result};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use tracing::{error, warn};

/// Builds an open service handler for an accepted connection
pub trait CreationStrategy: Send + Sync {
    fn create(&self, handle: SocketHandle) -> Result<Arc<dyn ServiceHandler>>;
}

/// Schedules a handler's `run()`
pub trait ConcurrencyStrategy: Send + Sync {
    fn activate(&self, handler: Arc<dyn ServiceHandler>) -> Result<()>;
}

/// Source of the strategies the acceptor uses
pub trait StrategyFactory: Send + Sync {
    fn creation_strategy(&self) -> Arc<dyn CreationStrategy>;
    fn concurrency_strategy(&self) -> Arc<dyn ConcurrencyStrategy>;
}

/// Builds handlers with a constructor function, then opens them
pub struct DefaultCreationStrategy<H, F> {
    make: F,
    _handler: PhantomData<fn() -> H>,
}

impl<H, F> DefaultCreationStrategy<H, F>
where
    H: ServiceHandler + 'static,
    F: Fn() -> H + Send + Sync,
{
    pub fn new(make: F) -> Self {
        DefaultCreationStrategy {
            make,
            _handler: PhantomData,
        }
    }
}

impl<H, F> CreationStrategy for DefaultCreationStrategy<H, F>
where
    H: ServiceHandler + 'static,
    F: Fn() -> H + Send + Sync,
{
    fn create(&self, handle: SocketHandle) -> Result<Arc<dyn ServiceHandler>> {
        let handler = (self.make)();
        handler
            .open(handle)
            .map_err(|e| Error::Instantiation(e.to_string()))?;
        Ok(Arc::new(handler))
    }
}

/// Runs the handler inline on the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ReactiveStrategy;

impl ConcurrencyStrategy for ReactiveStrategy {
    fn activate(&self, handler: Arc<dyn ServiceHandler>) -> Result<()> {
        run_guarded(handler.as_ref());
        Ok(())
    }
}

/// Runs every handler on its own thread
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPerConnectionStrategy;

impl ConcurrencyStrategy for ThreadPerConnectionStrategy {
    fn activate(&self, handler: Arc<dyn ServiceHandler>) -> Result<()> {
        thread::Builder::new()
            .name("connection".into())
            .spawn(move || run_guarded(handler.as_ref()))
            .map(drop)
            .map_err(Error::Spawn)
    }
}

/// Runs handlers on a bounded thread pool
pub struct ThreadPoolStrategy {
    pool: ThreadPool,
    admission: Admission,
}

impl ThreadPoolStrategy {
    pub fn new(workers: usize, queue_capacity: usize, admission: Admission) -> Result<Self> {
        Ok(ThreadPoolStrategy {
            pool: ThreadPool::new(workers, queue_capacity)?,
            admission,
        })
    }

    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }
}

impl ConcurrencyStrategy for ThreadPoolStrategy {
    fn activate(&self, handler: Arc<dyn ServiceHandler>) -> Result<()> {
        self.pool
            .submit(self.admission, move || run_guarded(handler.as_ref()))
    }
}

/// Run a handler, containing any panic
///
/// A handler that panics is closed so its connection is not leaked.
fn run_guarded(handler: &dyn ServiceHandler) {
    if panic::catch_unwind(AssertUnwindSafe(|| handler.run())).is_err() {
        error!("service handler panicked");
        if let Err(e) = handler.close() {
            warn!("failed to close handler after panic: {}", e);
        }
    }
}

/// Which concurrency strategy to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyPolicy {
    Reactive,
    ThreadPerConnection,
    Pooled {
        workers: usize,
        queue_capacity: usize,
        admission: Admission,
    },
}

impl ConcurrencyPolicy {
    /// Build the strategy; pools start their workers here
    pub fn build(&self) -> Result<Arc<dyn ConcurrencyStrategy>> {
        let strategy: Arc<dyn ConcurrencyStrategy> = match *self {
            ConcurrencyPolicy::Reactive => Arc::new(ReactiveStrategy),
            ConcurrencyPolicy::ThreadPerConnection => Arc::new(ThreadPerConnectionStrategy),
            ConcurrencyPolicy::Pooled {
                workers,
                queue_capacity,
                admission,
            } => Arc::new(ThreadPoolStrategy::new(workers, queue_capacity, admission)?),
        };
        Ok(strategy)
    }
}

/// Hands out the same pair of strategies for the life of the server
#[derive(Clone)]
pub struct ConfiguredStrategyFactory {
    creation: Arc<dyn CreationStrategy>,
    concurrency: Arc<dyn ConcurrencyStrategy>,
}

impl ConfiguredStrategyFactory {
    pub fn new(
        creation: Arc<dyn CreationStrategy>,
        concurrency: Arc<dyn ConcurrencyStrategy>,
    ) -> Self {
        ConfiguredStrategyFactory {
            creation,
            concurrency,
        }
    }

    /// Pair `creation` with a strategy built from `policy`
    pub fn with_policy(
        creation: Arc<dyn CreationStrategy>,
        policy: ConcurrencyPolicy,
    ) -> Result<Self> {
        Ok(Self::new(creation, policy.build()?))
    }
}

impl StrategyFactory for ConfiguredStrategyFactory {
    fn creation_strategy(&self) -> Arc<dyn CreationStrategy> {
        Arc::clone(&self.creation)
    }

    fn concurrency_strategy(&self) -> Arc<dyn ConcurrencyStrategy> {
        Arc::clone(&self.concurrency)
    }
}
