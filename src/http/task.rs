//! HTTP task
//!
//! One task serves one request: read it, resolve it, and write exactly one
//! response. Every failure along the way becomes an error response through
//! [`ErrorHandler`]; a failure to write is only logged.

use super::error::Error;
use super::error_handler::ErrorHandler;
use super::parser::RequestReader;
use super::resolver::Resolver;
use super::settings::HttpSettings;
use super::status::Status;
use crate::reactor::{SocketHandle, Task};
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a task run produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpOutcome {
    /// A resolved response was written
    Served(Status),
    /// An error response was written
    Failed(Status),
    /// Writing the response failed
    WriteFailed,
}

/// Reads one request and writes one response
pub struct HttpTask<R, W> {
    reader: RequestReader<R>,
    writer: W,
    resolver: Arc<dyn Resolver>,
}

impl HttpTask<BufReader<TcpStream>, TcpStream> {
    /// Build a task over an accepted connection
    pub fn for_socket(handle: &SocketHandle, settings: &HttpSettings) -> io::Result<Self> {
        let reader = BufReader::new(handle.try_clone_stream()?);
        let writer = handle.try_clone_stream()?;
        Ok(Self::new(reader, writer, settings))
    }
}

impl<R: BufRead, W: Write> HttpTask<R, W> {
    pub fn new(reader: R, writer: W, settings: &HttpSettings) -> Self {
        HttpTask {
            reader: RequestReader::new(reader, settings.parser.clone()),
            writer,
            resolver: Arc::clone(&settings.resolver),
        }
    }

    /// Serve the request and report what was sent
    pub fn execute(mut self) -> HttpOutcome {
        let resolved = self.reader.read_request().and_then(|request| {
            request.trace();
            self.resolver.resolve(&request)
        });

        match resolved {
            Ok(response) => {
                let status = response.status();
                match response.write_to(&mut self.writer) {
                    Ok(()) => {
                        debug!(%status, "response sent");
                        HttpOutcome::Served(status)
                    }
                    Err(e) => {
                        warn!(%status, "failed to write response: {}", e);
                        HttpOutcome::WriteFailed
                    }
                }
            }
            Err(err) => self.send_error(&err),
        }
    }

    fn send_error(&mut self, err: &Error) -> HttpOutcome {
        let handler = ErrorHandler::new(err);
        let status = handler.response().status();
        match handler.send(&mut self.writer) {
            Ok(()) => HttpOutcome::Failed(status),
            Err(e) => {
                warn!(%status, "failed to write error response: {}", e);
                HttpOutcome::WriteFailed
            }
        }
    }
}

impl<R, W> Task for HttpTask<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn run(self: Box<Self>) {
        let outcome = self.execute();
        debug!(?outcome, "task finished");
    }
}
