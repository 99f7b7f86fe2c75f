//! Acceptor-Connector framework
//!
//! A protocol-agnostic skeleton for servers built from three roles:
//!
//! - the [`Reactor`] waits on listening handles and dispatches events to
//!   registered [`EventHandler`]s on a single thread
//! - an [`Acceptor`] reacts to `Accept` events by asking a
//!   [`CreationStrategy`] for a [`ServiceHandler`] bound to the new
//!   connection and handing it to a [`ConcurrencyStrategy`]
//! - a [`ServiceHandler`] owns one connection and runs a single-use [`Task`]
//!   that does the protocol work
//!
//! Which strategies are used is fixed at startup through a
//! [`StrategyFactory`].

pub mod acceptor;
pub mod dispatcher;
pub mod handle;
pub mod pool;
pub mod service;
pub mod strategy;

pub use acceptor::Acceptor;
pub use dispatcher::{InitiationDispatcher, Reactor, ReactorState};
pub use handle::{Handle, HandleId, ServerSocketHandle, SocketHandle};
pub use pool::{Admission, ThreadPool};
pub use service::{HandlerState, ServiceHandler, Task};
pub use strategy::{
    ConcurrencyPolicy, ConcurrencyStrategy, ConfiguredStrategyFactory, CreationStrategy,
    DefaultCreationStrategy, ReactiveStrategy, StrategyFactory, ThreadPerConnectionStrategy,
    ThreadPoolStrategy,
};

use std::fmt;
use std::net::SocketAddr;

/// Result type for framework operations
pub type Result<T> = std::result::Result<T, Error>;

/// Framework errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("event {0} is not supported for this handle")]
    Unsupported(EventType),

    #[error("reactor is {0}")]
    InvalidState(ReactorState),

    #[error("failed to instantiate service handler: {0}")]
    Instantiation(String),

    #[error("activation rejected: {0}")]
    Rejected(String),

    #[error("failed to spawn thread: {0}")]
    Spawn(std::io::Error),
}

/// Events a handler can be notified of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Accept,
    Read,
    Write,
    Timeout,
    Signal,
    Close,
    Removed,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Accept => "ACCEPT",
            EventType::Read => "READ",
            EventType::Write => "WRITE",
            EventType::Timeout => "TIMEOUT",
            EventType::Signal => "SIGNAL",
            EventType::Close => "CLOSE",
            EventType::Removed => "REMOVED",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of reactor events
///
/// Calls arrive on the reactor thread, one at a time.
pub trait EventHandler: Send + Sync {
    /// React to `event` on `handle`
    ///
    /// For `Accept` the handle is the newly accepted connection; for other
    /// events it is the handler's own listening handle.
    fn handle_event(&self, handle: Handle, event: EventType, message: &str) -> Result<()>;

    /// The handle this handler waits on, once it has one
    fn handle(&self) -> Option<Handle>;
}
