//! Acceptor role

use super::dispatcher::Reactor;
use super::strategy::StrategyFactory;
use super::{EventHandler, Result};
use std::net::SocketAddr;
use std::sync::Arc;

/// Passive connection establishment
///
/// Opening binds the listening handle, keeps the factory for later
/// `Accept` events and registers with the reactor.
pub trait Acceptor: EventHandler {
    fn open(
        self: Arc<Self>,
        addr: SocketAddr,
        reactor: &dyn Reactor,
        factory: Arc<dyn StrategyFactory>,
    ) -> Result<()>;
}
