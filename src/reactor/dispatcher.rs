//! Event demultiplexing and dispatch
//!
//! [`InitiationDispatcher`] waits on every registered listening handle with
//! `poll(2)` and calls the owning handler for each ready one, on the loop
//! thread, one event at a time. A socket pair wakes the loop for new
//! registrations and for [`Reactor::stop`].

use super::handle::{self, Handle, HandleId, ServerSocketHandle};
use super::{Error, EventHandler, EventType, Result};
use std::fmt;
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::os::unix::net::UnixStream;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Event demultiplexer
pub trait Reactor: Send + Sync {
    /// Register interest in `event` on the handler's handle
    fn register_handler(&self, handler: Arc<dyn EventHandler>, event: EventType) -> Result<()>;

    /// Drop a registration; the handler receives `Removed`
    fn remove_handler(&self, id: HandleId) -> Result<()>;

    /// Wait for and dispatch events until stopped
    fn handle_events(&self) -> Result<()>;

    /// Ask a running loop to finish; callable from any thread
    fn stop(&self);
}

/// Dispatcher lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for ReactorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReactorState::Idle => "idle",
            ReactorState::Running => "running",
            ReactorState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[derive(Clone)]
struct Registration {
    listener: ServerSocketHandle,
    handler: Arc<dyn EventHandler>,
}

/// `poll(2)` based reactor
pub struct InitiationDispatcher {
    registrations: Mutex<Vec<Registration>>,
    state: Mutex<ReactorState>,
    stop_requested: AtomicBool,
    wake_rx: UnixStream,
    wake_tx: UnixStream,
}

impl InitiationDispatcher {
    pub fn new() -> Result<Self> {
        let (wake_rx, wake_tx) = UnixStream::pair()?;
        wake_rx.set_nonblocking(true)?;
        wake_tx.set_nonblocking(true)?;

        Ok(InitiationDispatcher {
            registrations: Mutex::new(Vec::new()),
            state: Mutex::new(ReactorState::Idle),
            stop_requested: AtomicBool::new(false),
            wake_rx,
            wake_tx,
        })
    }

    pub fn state(&self) -> ReactorState {
        *lock(&self.state)
    }

    /// Number of registered handlers
    pub fn registered(&self) -> usize {
        lock(&self.registrations).len()
    }

    fn wake(&self) {
        // a full pipe already guarantees a wake-up
        let _ = (&self.wake_tx).write(&[1]);
    }

    fn drain_wake(&self) {
        let mut buf = [0u8; 64];
        loop {
            match (&self.wake_rx).read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    fn run_loop(&self) -> Result<()> {
        while !self.stop_requested.load(Ordering::SeqCst) {
            let snapshot: Vec<Registration> = lock(&self.registrations).clone();

            let mut fds = Vec::with_capacity(snapshot.len() + 1);
            fds.push(pollfd(self.wake_rx.as_raw_fd()));
            fds.extend(snapshot.iter().map(|r| pollfd(r.listener.as_raw_fd())));

            match handle::poll(&mut fds, None) {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }

            if fds[0].revents != 0 {
                self.drain_wake();
            }

            for (reg, fd) in snapshot.iter().zip(&fds[1..]) {
                if fd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                    warn!(id = %reg.listener.id(), "listening handle failed, removing it");
                    if let Err(e) = self.remove_handler(reg.listener.id()) {
                        debug!("{}", e);
                    }
                } else if fd.revents & libc::POLLIN != 0 {
                    self.accept_ready(reg);
                }
            }
        }
        Ok(())
    }

    fn accept_ready(&self, reg: &Registration) {
        loop {
            match reg.listener.accept() {
                Ok(Some(socket)) => {
                    let message = format!("connection from {}", socket.peer_addr());
                    dispatch(&reg.handler, Handle::Socket(socket), EventType::Accept, &message);
                }
                Ok(None) => break,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::Interrupted | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    continue
                }
                Err(e) => {
                    error!(id = %reg.listener.id(), "accept failed: {}", e);
                    break;
                }
            }
        }
    }
}

impl Reactor for InitiationDispatcher {
    fn register_handler(&self, handler: Arc<dyn EventHandler>, event: EventType) -> Result<()> {
        let state = self.state();
        if state == ReactorState::Stopped {
            return Err(Error::InvalidState(state));
        }

        let listener = match handler.handle() {
            Some(Handle::Listener(listener)) => listener,
            Some(Handle::Socket(_)) => return Err(Error::Unsupported(event)),
            None => return Err(Error::Argument("handler has no handle".into())),
        };
        if event != EventType::Accept {
            return Err(Error::Unsupported(event));
        }

        {
            let mut registrations = lock(&self.registrations);
            if registrations
                .iter()
                .any(|r| r.listener.id() == listener.id())
            {
                return Err(Error::Argument(format!(
                    "handle {} is already registered",
                    listener.id()
                )));
            }
            debug!(id = %listener.id(), addr = %listener.local_addr(), "registered for {}", event);
            registrations.push(Registration { listener, handler });
        }

        self.wake();
        Ok(())
    }

    fn remove_handler(&self, id: HandleId) -> Result<()> {
        let removed = {
            let mut registrations = lock(&self.registrations);
            let idx = registrations
                .iter()
                .position(|r| r.listener.id() == id)
                .ok_or_else(|| Error::Argument(format!("handle {} is not registered", id)))?;
            registrations.remove(idx)
        };

        dispatch(
            &removed.handler,
            Handle::Listener(removed.listener.clone()),
            EventType::Removed,
            "handler removed",
        );
        self.wake();
        Ok(())
    }

    fn handle_events(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            if *state != ReactorState::Idle {
                return Err(Error::InvalidState(*state));
            }
            *state = ReactorState::Running;
        }
        info!("reactor running");

        let result = self.run_loop();

        let remaining: Vec<Registration> = lock(&self.registrations).drain(..).collect();
        for reg in remaining {
            dispatch(
                &reg.handler,
                Handle::Listener(reg.listener.clone()),
                EventType::Close,
                "reactor stopped",
            );
        }
        *lock(&self.state) = ReactorState::Stopped;

        match &result {
            Ok(()) => info!("reactor stopped"),
            Err(e) => error!("reactor failed: {}", e),
        }
        result
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Deliver one event; failures and panics are logged, never propagated
fn dispatch(handler: &Arc<dyn EventHandler>, handle: Handle, event: EventType, message: &str) {
    let id = handle.id();
    let outcome =
        panic::catch_unwind(AssertUnwindSafe(|| handler.handle_event(handle, event, message)));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(%id, "{} handler failed: {}", event, e),
        Err(_) => error!(%id, "{} handler panicked", event),
    }
}

fn pollfd(fd: i32) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactor::handle::DEFAULT_BACKLOG;
    use std::net::TcpStream;
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    struct Recorder {
        listener: Option<ServerSocketHandle>,
        events: Mutex<mpsc::Sender<EventType>>,
    }

    impl EventHandler for Recorder {
        fn handle_event(&self, _handle: Handle, event: EventType, _message: &str) -> Result<()> {
            self.events.lock().unwrap().send(event).unwrap();
            Ok(())
        }

        fn handle(&self) -> Option<Handle> {
            self.listener.clone().map(Handle::Listener)
        }
    }

    fn recorder() -> (Arc<Recorder>, mpsc::Receiver<EventType>) {
        let (tx, rx) = mpsc::channel();
        let listener =
            ServerSocketHandle::bind("127.0.0.1:0".parse().unwrap(), DEFAULT_BACKLOG).unwrap();
        let recorder = Recorder {
            listener: Some(listener),
            events: Mutex::new(tx),
        };
        (Arc::new(recorder), rx)
    }

    #[test]
    fn test_dispatches_accept_then_close_on_stop() {
        let reactor = Arc::new(InitiationDispatcher::new().unwrap());
        let (handler, events) = recorder();
        let addr = handler.listener.as_ref().unwrap().local_addr();
        reactor
            .register_handler(handler.clone(), EventType::Accept)
            .unwrap();

        let r = Arc::clone(&reactor);
        let looper = thread::spawn(move || r.handle_events());

        let _client = TcpStream::connect(addr).unwrap();
        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event, EventType::Accept);

        reactor.stop();
        looper.join().unwrap().unwrap();
        assert_eq!(
            events.recv_timeout(Duration::from_secs(5)).unwrap(),
            EventType::Close
        );
        assert_eq!(reactor.state(), ReactorState::Stopped);
        assert_eq!(reactor.registered(), 0);
    }

    #[test]
    fn test_register_rejects_bad_input() {
        let reactor = InitiationDispatcher::new().unwrap();
        let (handler, _events) = recorder();

        let err = reactor
            .register_handler(handler.clone(), EventType::Read)
            .unwrap_err();
        assert!(matches!(err, Error::Unsupported(EventType::Read)));

        let (tx, _rx) = mpsc::channel();
        let unopened = Arc::new(Recorder {
            listener: None,
            events: Mutex::new(tx),
        });
        let err = reactor
            .register_handler(unopened, EventType::Accept)
            .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));

        reactor
            .register_handler(handler.clone(), EventType::Accept)
            .unwrap();
        assert!(reactor
            .register_handler(handler, EventType::Accept)
            .is_err());
    }

    #[test]
    fn test_remove_dispatches_removed() {
        let reactor = InitiationDispatcher::new().unwrap();
        let (handler, events) = recorder();
        let id = handler.listener.as_ref().unwrap().id();
        reactor
            .register_handler(handler, EventType::Accept)
            .unwrap();

        reactor.remove_handler(id).unwrap();
        assert_eq!(events.try_recv().unwrap(), EventType::Removed);
        assert!(reactor.remove_handler(id).is_err());
    }

    #[test]
    fn test_handle_events_only_once() {
        let reactor = InitiationDispatcher::new().unwrap();
        reactor.stop();
        reactor.handle_events().unwrap();
        assert!(matches!(
            reactor.handle_events(),
            Err(Error::InvalidState(ReactorState::Stopped))
        ));
    }
}
