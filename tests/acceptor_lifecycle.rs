//! Acceptor bookkeeping tests
//!
//! These use scripted service handlers to observe how the acceptor and the
//! concurrency strategies drive handler lifecycles.

use httpreactor::http::HttpAcceptor;
use httpreactor::reactor::{
    Acceptor, Admission, ConcurrencyPolicy, ConcurrencyStrategy, ConfiguredStrategyFactory,
    CreationStrategy, DefaultCreationStrategy, Error, EventHandler, EventType, Handle,
    HandlerState, InitiationDispatcher, Result, ServiceHandler, SocketHandle, Task,
};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Counts lifecycle calls; closing can be made to fail
struct Scripted {
    runs: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
    state: Mutex<HandlerState>,
}

impl ServiceHandler for Scripted {
    fn open(&self, _handle: SocketHandle) -> Result<()> {
        *self.state.lock().unwrap() = HandlerState::Open;
        Ok(())
    }

    fn run(&self) {
        self.runs.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(5));
        *self.state.lock().unwrap() = HandlerState::Closed;
    }

    fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        *self.state.lock().unwrap() = HandlerState::Closed;
        if self.fail_close {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "scripted close failure",
            )));
        }
        Ok(())
    }

    fn task(&self) -> Result<Box<dyn Task>> {
        Err(Error::Argument("scripted handlers have no task".into()))
    }

    fn state(&self) -> HandlerState {
        *self.state.lock().unwrap()
    }
}

/// Accepts activation without ever running the handler
struct Parked;

impl ConcurrencyStrategy for Parked {
    fn activate(&self, _handler: Arc<dyn ServiceHandler>) -> Result<()> {
        Ok(())
    }
}

struct Counters {
    created: AtomicUsize,
    runs: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Counters {
    fn new() -> Arc<Self> {
        Arc::new(Counters {
            created: AtomicUsize::new(0),
            runs: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Handler factory where every `fail_every`-th handler fails to close
    fn creation(self: &Arc<Self>, fail_every: usize) -> Arc<dyn CreationStrategy> {
        let counters = Arc::clone(self);
        Arc::new(DefaultCreationStrategy::new(move || {
            let n = counters.created.fetch_add(1, Ordering::SeqCst) + 1;
            Scripted {
                runs: Arc::clone(&counters.runs),
                closes: Arc::clone(&counters.closes),
                fail_close: fail_every != 0 && n % fail_every == 0,
                state: Mutex::new(HandlerState::Created),
            }
        }))
    }
}

fn open_acceptor(
    creation: Arc<dyn CreationStrategy>,
    concurrency: Arc<dyn ConcurrencyStrategy>,
) -> (Arc<HttpAcceptor>, InitiationDispatcher) {
    let reactor = InitiationDispatcher::new().unwrap();
    let acceptor = Arc::new(HttpAcceptor::new());
    let factory = ConfiguredStrategyFactory::new(creation, concurrency);
    Arc::clone(&acceptor)
        .open("127.0.0.1:0".parse().unwrap(), &reactor, Arc::new(factory))
        .unwrap();
    (acceptor, reactor)
}

/// Deliver `n` accepted connections straight to the acceptor
fn accept_n(acceptor: &HttpAcceptor, n: usize) -> Vec<TcpStream> {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let mut clients = Vec::new();

    for _ in 0..n {
        clients.push(TcpStream::connect(addr).unwrap());
        let (server, _) = listener.accept().unwrap();
        let socket = SocketHandle::new(server).unwrap();
        acceptor
            .handle_event(Handle::Socket(socket), EventType::Accept, "test connection")
            .unwrap();
    }
    clients
}

#[test]
fn test_close_reaches_every_handler_despite_failures() {
    let counters = Counters::new();
    let (acceptor, _reactor) = open_acceptor(counters.creation(3), Arc::new(Parked));

    let _clients = accept_n(&acceptor, 10);
    assert_eq!(acceptor.live_handlers(), 10);

    let listener = match acceptor.handle() {
        Some(handle) => handle,
        None => panic!("open acceptor has a handle"),
    };
    acceptor
        .handle_event(listener, EventType::Close, "shutdown")
        .unwrap();

    assert_eq!(counters.closes.load(Ordering::SeqCst), 10);
    assert_eq!(counters.runs.load(Ordering::SeqCst), 0);
    assert_eq!(acceptor.live_handlers(), 0);
}

#[test]
fn test_removed_also_tears_down() {
    let counters = Counters::new();
    let (acceptor, _reactor) = open_acceptor(counters.creation(0), Arc::new(Parked));
    let _clients = accept_n(&acceptor, 3);

    let listener = acceptor.handle().unwrap();
    acceptor
        .handle_event(listener, EventType::Removed, "removed")
        .unwrap();
    assert_eq!(counters.closes.load(Ordering::SeqCst), 3);
}

#[test]
fn test_pool_runs_each_handler_exactly_once() {
    const CONNECTIONS: usize = 40;

    let counters = Counters::new();
    let pool = ConcurrencyPolicy::Pooled {
        workers: 4,
        queue_capacity: CONNECTIONS,
        admission: Admission::Block,
    }
    .build()
    .unwrap();
    let (acceptor, _reactor) = open_acceptor(counters.creation(0), pool);

    let _clients = accept_n(&acceptor, CONNECTIONS);

    let deadline = Instant::now() + Duration::from_secs(10);
    while counters.runs.load(Ordering::SeqCst) < CONNECTIONS && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    // give a duplicate run the chance to show up
    thread::sleep(Duration::from_millis(50));

    assert_eq!(counters.created.load(Ordering::SeqCst), CONNECTIONS);
    assert_eq!(counters.runs.load(Ordering::SeqCst), CONNECTIONS);
}

#[test]
fn test_finished_handlers_are_pruned() {
    let counters = Counters::new();
    let reactive = ConcurrencyPolicy::Reactive.build().unwrap();
    let (acceptor, _reactor) = open_acceptor(counters.creation(0), reactive);

    let _clients = accept_n(&acceptor, 5);
    assert_eq!(counters.runs.load(Ordering::SeqCst), 5);
    // only the last handler is still tracked; earlier ones were pruned on accept
    assert_eq!(acceptor.live_handlers(), 1);
}

struct Refusing;

impl CreationStrategy for Refusing {
    fn create(&self, _handle: SocketHandle) -> Result<Arc<dyn ServiceHandler>> {
        Err(Error::Instantiation("no handlers today".into()))
    }
}

#[test]
fn test_creation_failure_only_affects_that_event() {
    let (acceptor, _reactor) = open_acceptor(Arc::new(Refusing), Arc::new(Parked));

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let _client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (server, _) = listener.accept().unwrap();

    let err = acceptor
        .handle_event(
            Handle::Socket(SocketHandle::new(server).unwrap()),
            EventType::Accept,
            "refused",
        )
        .unwrap_err();
    assert!(matches!(err, Error::Instantiation(_)));
    assert_eq!(acceptor.live_handlers(), 0);

    // the acceptor keeps working for later events
    let listener_handle = acceptor.handle().unwrap();
    acceptor
        .handle_event(listener_handle, EventType::Close, "shutdown")
        .unwrap();
}
