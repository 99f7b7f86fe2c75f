//! HTTP acceptor
//!
//! Accepts connections for the HTTP server: every `Accept` event becomes an
//! open service handler that is tracked by connection id and activated under
//! the configured concurrency strategy. `Close` and `Removed` tear down all
//! tracked handlers.

use crate::reactor::handle::DEFAULT_BACKLOG;
use crate::reactor::{
    Acceptor, Error, EventHandler, EventType, Handle, HandleId, HandlerState, Reactor, Result,
    ServerSocketHandle, ServiceHandler, SocketHandle, StrategyFactory,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, error, info, warn};

/// Acceptor for HTTP connections
#[derive(Default)]
pub struct HttpAcceptor {
    listener: OnceLock<ServerSocketHandle>,
    factory: OnceLock<Arc<dyn StrategyFactory>>,
    handlers: Mutex<HashMap<HandleId, Arc<dyn ServiceHandler>>>,
}

impl HttpAcceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound address, once open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.get().map(ServerSocketHandle::local_addr)
    }

    /// Number of tracked handlers that have not been pruned yet
    pub fn live_handlers(&self) -> usize {
        self.lock_handlers().len()
    }

    fn lock_handlers(&self) -> MutexGuard<'_, HashMap<HandleId, Arc<dyn ServiceHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn accept(&self, socket: SocketHandle, message: &str) -> Result<()> {
        let factory = self
            .factory
            .get()
            .ok_or_else(|| Error::Argument("acceptor is not open".into()))?;
        let creation = factory.creation_strategy();
        let concurrency = factory.concurrency_strategy();

        let id = socket.id();
        debug!(%id, "{}", message);
        let handler = creation.create(socket)?;

        {
            let mut handlers = self.lock_handlers();
            handlers.retain(|_, h| h.state() != HandlerState::Closed);
            handlers.entry(id).or_insert_with(|| Arc::clone(&handler));
        }

        if let Err(e) = concurrency.activate(Arc::clone(&handler)) {
            self.lock_handlers().remove(&id);
            if let Err(close_err) = handler.reject(&e.to_string()) {
                debug!(%id, "failed to reject connection: {}", close_err);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Close every tracked handler; one failure does not stop the rest
    fn close_all(&self) {
        let handlers: Vec<_> = self.lock_handlers().drain().collect();
        if handlers.is_empty() {
            return;
        }
        info!(count = handlers.len(), "closing service handlers");

        for (id, handler) in handlers {
            match panic::catch_unwind(AssertUnwindSafe(|| handler.close())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(%id, "failed to close service handler: {}", e),
                Err(_) => error!(%id, "service handler panicked while closing"),
            }
        }
    }
}

impl EventHandler for HttpAcceptor {
    fn handle_event(&self, handle: Handle, event: EventType, message: &str) -> Result<()> {
        match event {
            EventType::Accept => match handle {
                Handle::Socket(socket) => self.accept(socket, message),
                Handle::Listener(_) => Err(Error::Argument(
                    "accept event without a connection handle".into(),
                )),
            },
            EventType::Close | EventType::Removed => {
                debug!(id = %handle.id(), "{}: {}", event, message);
                self.close_all();
                Ok(())
            }
            other => {
                warn!("ignoring unexpected {} event", other);
                Ok(())
            }
        }
    }

    fn handle(&self) -> Option<Handle> {
        self.listener.get().cloned().map(Handle::Listener)
    }
}

impl Acceptor for HttpAcceptor {
    fn open(
        self: Arc<Self>,
        addr: SocketAddr,
        reactor: &dyn Reactor,
        factory: Arc<dyn StrategyFactory>,
    ) -> Result<()> {
        if self.listener.get().is_some() {
            return Err(Error::Argument("acceptor is already open".into()));
        }

        let listener = ServerSocketHandle::bind(addr, DEFAULT_BACKLOG)?;
        let local_addr = listener.local_addr();
        if self.listener.set(listener).is_err() || self.factory.set(factory).is_err() {
            return Err(Error::Argument("acceptor is already open".into()));
        }

        reactor.register_handler(self, EventType::Accept)?;
        info!(addr = %local_addr, "accepting HTTP connections");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{HttpServiceHandler, HttpSettings};
    use crate::reactor::{
        ConfiguredStrategyFactory, CreationStrategy, DefaultCreationStrategy,
        InitiationDispatcher, ReactiveStrategy,
    };
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use std::thread;

    fn reactive_factory() -> Arc<dyn StrategyFactory> {
        let settings = Arc::new(HttpSettings::default());
        let creation: Arc<dyn CreationStrategy> = Arc::new(DefaultCreationStrategy::new(
            move || HttpServiceHandler::new(Arc::clone(&settings)),
        ));
        Arc::new(ConfiguredStrategyFactory::new(creation, Arc::new(ReactiveStrategy)))
    }

    #[test]
    fn test_open_registers_once() {
        let reactor = InitiationDispatcher::new().unwrap();
        let acceptor = Arc::new(HttpAcceptor::new());
        assert!(acceptor.handle().is_none());

        Arc::clone(&acceptor)
            .open("127.0.0.1:0".parse().unwrap(), &reactor, reactive_factory())
            .unwrap();
        assert!(acceptor.local_addr().is_some());
        assert_eq!(reactor.registered(), 1);

        let err = Arc::clone(&acceptor)
            .open("127.0.0.1:0".parse().unwrap(), &reactor, reactive_factory())
            .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_accept_serves_connection() {
        let reactor = InitiationDispatcher::new().unwrap();
        let acceptor = Arc::new(HttpAcceptor::new());
        Arc::clone(&acceptor)
            .open("127.0.0.1:0".parse().unwrap(), &reactor, reactive_factory())
            .unwrap();
        let addr = acceptor.local_addr().unwrap();

        let client = thread::spawn(move || {
            let mut stream = TcpStream::connect(addr).unwrap();
            stream.write_all(b"GET / HTTP/1.0\r\n\r\n").unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).unwrap();
            response
        });

        let listener = acceptor.listener.get().unwrap().clone();
        let socket = loop {
            if let Some(socket) = listener.accept().unwrap() {
                break socket;
            }
            thread::yield_now();
        };
        acceptor
            .handle_event(Handle::Socket(socket), EventType::Accept, "test")
            .unwrap();

        assert!(client.join().unwrap().starts_with("HTTP/1.1 200 OK\r\n"));
        assert_eq!(acceptor.live_handlers(), 1);

        // a closed handler is pruned on the next accept and on teardown
        acceptor
            .handle_event(Handle::Listener(listener), EventType::Close, "shutdown")
            .unwrap();
        assert_eq!(acceptor.live_handlers(), 0);
    }

    #[test]
    fn test_accept_before_open_fails() {
        let acceptor = HttpAcceptor::new();
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        let socket = SocketHandle::new(server).unwrap();

        let err = acceptor
            .handle_event(Handle::Socket(socket), EventType::Accept, "early")
            .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_other_events_ignored() {
        let acceptor = HttpAcceptor::new();
        let listener =
            ServerSocketHandle::bind("127.0.0.1:0".parse().unwrap(), DEFAULT_BACKLOG).unwrap();
        for event in [EventType::Read, EventType::Write, EventType::Timeout, EventType::Signal] {
            acceptor
                .handle_event(Handle::Listener(listener.clone()), event, "noise")
                .unwrap();
        }
    }
}
