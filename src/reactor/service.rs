//! Service handlers and tasks
//!
//! A service handler is bound to one accepted connection and moves through
//! `Created -> Open -> Running -> Closed`. Running it builds a fresh
//! [`Task`], runs it to completion, and closes the handler.

use super::handle::SocketHandle;
use super::Result;
use std::fmt;
use tracing::debug;

/// Lifecycle state of a service handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerState {
    Created,
    Open,
    Running,
    Closed,
}

impl fmt::Display for HandlerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandlerState::Created => "created",
            HandlerState::Open => "open",
            HandlerState::Running => "running",
            HandlerState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Single-use unit of work; running consumes it
pub trait Task: Send {
    fn run(self: Box<Self>);
}

/// Per-connection handler
pub trait ServiceHandler: Send + Sync {
    /// Bind the handler to its connection
    fn open(&self, handle: SocketHandle) -> Result<()>;

    /// Run a task for the connection, then close
    fn run(&self);

    /// Release the connection; closing twice is a no-op
    fn close(&self) -> Result<()>;

    /// Build a new task for the bound connection
    fn task(&self) -> Result<Box<dyn Task>>;

    fn state(&self) -> HandlerState;

    /// Turn the connection away without running it
    fn reject(&self, reason: &str) -> Result<()> {
        debug!("rejecting connection: {}", reason);
        self.close()
    }
}
