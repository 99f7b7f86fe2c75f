//! Integration tests for the HTTP server
//!
//! These tests run the reactor on a background thread and talk to it over
//! loopback sockets.

use httpreactor::http::{
    Error, HttpAcceptor, HttpServiceHandler, HttpSettings, Request, Resolver, Response,
    ResponseHeader, Status, MAX_REQUEST_TARGET_LEN,
};
use httpreactor::reactor::{
    Acceptor, Admission, ConcurrencyPolicy, ConfiguredStrategyFactory, CreationStrategy,
    DefaultCreationStrategy, InitiationDispatcher, Reactor,
};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct TestServer {
    addr: SocketAddr,
    reactor: Arc<InitiationDispatcher>,
    looper: Option<JoinHandle<()>>,
}

impl TestServer {
    fn start(policy: ConcurrencyPolicy, settings: HttpSettings) -> Self {
        let settings = Arc::new(settings);
        let creation: Arc<dyn CreationStrategy> =
            Arc::new(DefaultCreationStrategy::new(move || {
                HttpServiceHandler::new(Arc::clone(&settings))
            }));
        let factory = ConfiguredStrategyFactory::with_policy(creation, policy).unwrap();

        let reactor = Arc::new(InitiationDispatcher::new().unwrap());
        let acceptor = Arc::new(HttpAcceptor::new());
        Arc::clone(&acceptor)
            .open("127.0.0.1:0".parse().unwrap(), reactor.as_ref(), Arc::new(factory))
            .unwrap();
        let addr = acceptor.local_addr().unwrap();

        let r = Arc::clone(&reactor);
        let looper = thread::spawn(move || r.handle_events().unwrap());

        TestServer {
            addr,
            reactor,
            looper: Some(looper),
        }
    }

    fn connect(&self) -> TcpStream {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        stream
    }

    /// Send raw bytes, half-close, and read the whole response
    fn exchange(&self, request: &[u8]) -> String {
        let mut stream = self.connect();
        stream.write_all(request).unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.reactor.stop();
        if let Some(looper) = self.looper.take() {
            let _ = looper.join();
        }
    }
}

fn pooled(workers: usize, queue_capacity: usize, admission: Admission) -> ConcurrencyPolicy {
    ConcurrencyPolicy::Pooled {
        workers,
        queue_capacity,
        admission,
    }
}

#[test]
fn test_get_under_every_strategy() {
    let policies = [
        ConcurrencyPolicy::Reactive,
        ConcurrencyPolicy::ThreadPerConnection,
        pooled(2, 4, Admission::Block),
    ];

    for policy in policies {
        let server = TestServer::start(policy, HttpSettings::default());
        let response = server.exchange(b"GET /hello?x=1 HTTP/1.1\r\nHost: localhost\r\n\r\n");

        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"), "{:?}: {}", policy, response);
        assert!(response.contains("\r\nServer: httpreactor/"));
        assert!(response.ends_with("\r\n\r\nGET /hello?x=1 HTTP/1.1\r\nHost: localhost\r\n"));
    }
}

#[test]
fn test_protocol_errors_on_the_wire() {
    let server = TestServer::start(ConcurrencyPolicy::ThreadPerConnection, HttpSettings::default());

    let response = server.exchange(b"FOO / HTTP/1.1\r\nHost: a\r\n\r\n");
    assert_eq!(response, "HTTP/1.1 400 Bad Request\r\n\r\nunsupported method: FOO");

    let response = server.exchange(b"GET / HTTP/1.1 trailing\r\nHost: a\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n\r\n"));

    let response = server.exchange(b"GET / HTTP/1.1\r\n\r\n");
    assert_eq!(
        response,
        "HTTP/1.1 400 Bad Request\r\n\r\n\
         A client MUST include a Host header field in all HTTP/1.1 request messages"
    );

    let long = format!(
        "GET /{} HTTP/1.1\r\nHost: a\r\n\r\n",
        "x".repeat(MAX_REQUEST_TARGET_LEN)
    );
    let response = server.exchange(long.as_bytes());
    assert!(response.starts_with("HTTP/1.1 414 URI Too Long\r\n\r\n"));

    let response = server.exchange(b"POST / HTTP/1.1\r\nHost: a\r\nTransfer-Encoding: chunked\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 501 Not Implemented\r\n\r\n"));

    let response = server.exchange(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n\r\n"));
}

#[test]
fn test_request_body_with_content_length() {
    let server = TestServer::start(ConcurrencyPolicy::Reactive, HttpSettings::default());
    let response = server.exchange(
        b"POST /submit HTTP/1.1\r\nHost: a\r\nContent-Length: 11\r\n\r\nhello world",
    );
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[test]
fn test_read_timeout_answers_408() {
    let settings = HttpSettings {
        read_timeout: Some(Duration::from_millis(100)),
        ..HttpSettings::default()
    };
    let server = TestServer::start(ConcurrencyPolicy::ThreadPerConnection, settings);

    let mut stream = server.connect();
    let mut response = String::new();
    stream.read_to_string(&mut response).unwrap();
    assert!(response.starts_with("HTTP/1.1 408 Request Timeout\r\n\r\n"));
}

#[derive(Debug, Default)]
struct Counting {
    resolved: AtomicUsize,
}

impl Resolver for Counting {
    fn resolve(&self, _request: &Request) -> Result<Response, Error> {
        self.resolved.fetch_add(1, Ordering::SeqCst);
        let mut header = ResponseHeader::new(Status::NO_CONTENT);
        header.add_field("Connection", "close");
        Ok(Response::new(header, None))
    }
}

#[test]
fn test_pool_serves_concurrent_clients() {
    let counting = Arc::new(Counting::default());
    let settings = HttpSettings::default().with_resolver(counting.clone());
    let server = TestServer::start(pooled(4, 16, Admission::Block), settings);
    let addr = server.addr;

    let clients: Vec<_> = (0..32)
        .map(|n| {
            thread::spawn(move || {
                let mut stream = TcpStream::connect(addr).unwrap();
                stream
                    .set_read_timeout(Some(Duration::from_secs(10)))
                    .unwrap();
                write!(stream, "GET /{} HTTP/1.0\r\n\r\n", n).unwrap();
                let mut response = String::new();
                stream.read_to_string(&mut response).unwrap();
                response
            })
        })
        .collect();

    for client in clients {
        let response = client.join().unwrap();
        assert_eq!(response, "HTTP/1.1 204 No Content\r\nConnection: close\r\n\r\n");
    }
    assert_eq!(counting.resolved.load(Ordering::SeqCst), 32);
}

#[test]
fn test_saturated_pool_rejects_with_503() {
    let server = TestServer::start(pooled(1, 1, Admission::Reject), HttpSettings::default());

    // the only worker blocks reading from a silent client
    let busy = server.connect();
    thread::sleep(Duration::from_millis(200));
    // this one waits in the queue
    let queued = server.connect();
    thread::sleep(Duration::from_millis(200));

    let mut rejected = server.connect();
    let mut response = String::new();
    rejected.read_to_string(&mut response).unwrap();
    assert!(
        response.starts_with("HTTP/1.1 503 Service Unavailable\r\n\r\n"),
        "{}",
        response
    );

    drop(busy);
    drop(queued);
}

#[test]
fn test_stop_closes_open_connections() {
    let server = TestServer::start(ConcurrencyPolicy::ThreadPerConnection, HttpSettings::default());

    // a client that never sends anything keeps its handler blocked
    let mut idle = server.connect();
    thread::sleep(Duration::from_millis(200));

    drop(server);

    let mut buf = Vec::new();
    // shutdown by the acceptor ends the stream instead of hanging
    let result = idle.read_to_end(&mut buf);
    assert!(result.is_ok());
}
