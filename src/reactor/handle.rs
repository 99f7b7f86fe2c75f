//! Socket handles
//!
//! A [`ServerSocketHandle`] is a non-blocking listening socket shared
//! between its acceptor and the reactor. A [`SocketHandle`] is one accepted
//! connection, owned by exactly one service handler; it is deliberately not
//! `Clone`.

use super::{Error, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::fmt;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Listen backlog for server sockets
pub const DEFAULT_BACKLOG: i32 = 1024;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique handle identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Allocate the next identifier
    pub fn next() -> Self {
        HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Listening socket
#[derive(Debug, Clone)]
pub struct ServerSocketHandle {
    id: HandleId,
    socket: Arc<Socket>,
    local_addr: SocketAddr,
}

impl ServerSocketHandle {
    /// Bind a non-blocking listening socket with `SO_REUSEADDR`
    pub fn bind(addr: SocketAddr, backlog: i32) -> Result<Self> {
        Self::listen(addr, backlog).map_err(|source| Error::Bind { addr, source })
    }

    fn listen(addr: SocketAddr, backlog: i32) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.bind(&addr.into())?;
        socket.listen(backlog)?;
        socket.set_nonblocking(true)?;

        let local_addr = socket.local_addr()?.as_socket().ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "listening address is not an IP address")
        })?;

        Ok(ServerSocketHandle {
            id: HandleId::next(),
            socket: Arc::new(socket),
            local_addr,
        })
    }

    /// Accept one pending connection
    ///
    /// Returns `Ok(None)` when no connection is waiting. Accepted sockets are
    /// switched to blocking mode.
    pub fn accept(&self) -> io::Result<Option<SocketHandle>> {
        match self.socket.accept() {
            Ok((socket, _)) => {
                socket.set_nonblocking(false)?;
                SocketHandle::new(socket.into()).map(Some)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl AsRawFd for ServerSocketHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

/// One accepted connection
#[derive(Debug)]
pub struct SocketHandle {
    id: HandleId,
    stream: TcpStream,
    peer_addr: SocketAddr,
}

impl SocketHandle {
    /// Wrap a connected stream
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        Ok(SocketHandle {
            id: HandleId::next(),
            stream,
            peer_addr,
        })
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get a reference to the underlying stream
    pub fn stream(&self) -> &TcpStream {
        &self.stream
    }

    /// A second stream on the same socket, for split reading and writing
    pub fn try_clone_stream(&self) -> io::Result<TcpStream> {
        self.stream.try_clone()
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream.set_read_timeout(timeout)
    }

    /// Shut down both directions
    ///
    /// Readers blocked on clones of the stream wake up with end-of-file. A
    /// peer that already disconnected is not an error.
    pub fn close(&self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

impl AsRawFd for SocketHandle {
    fn as_raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }
}

/// A handle delivered with an event
#[derive(Debug)]
pub enum Handle {
    Listener(ServerSocketHandle),
    Socket(SocketHandle),
}

impl Handle {
    pub fn id(&self) -> HandleId {
        match self {
            Handle::Listener(l) => l.id(),
            Handle::Socket(s) => s.id(),
        }
    }
}

/// Wait until one of `fds` is ready
///
/// Returns the number of ready descriptors; zero means the timeout expired.
pub(crate) fn poll(fds: &mut [libc::pollfd], timeout: Option<Duration>) -> io::Result<usize> {
    let timeout_ms = timeout
        .map(|d| d.as_millis().min(i32::MAX as u128) as i32)
        .unwrap_or(-1); // -1 = infinite

    let result = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };

    if result < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(result as usize)
}
