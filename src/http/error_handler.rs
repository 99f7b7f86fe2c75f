//! Error-to-response translation
//!
//! The one place a failure becomes bytes on the wire. The response carries
//! the failure's status (500 when it has none), no header fields, and the
//! failure's message as the body.

use super::error::Error;
use super::message::MessageBody;
use super::response::{Response, ResponseHeader, StatusLine};
use std::io::{self, Write};
use tracing::{debug, error};

/// Builds and sends the response for one failure
#[derive(Debug)]
pub struct ErrorHandler {
    response: Response,
}

impl ErrorHandler {
    /// Create the error response for `err`
    pub fn new(err: &Error) -> Self {
        let header = ResponseHeader::with_status_line(StatusLine::for_error(err));
        let body = MessageBody::from(err.to_string());

        match err {
            Error::Client(_) => debug!(status = %header.status(), "client error: {}", err),
            Error::Server(_) | Error::Argument(_) => {
                error!(status = %header.status(), "server error: {:?}", err)
            }
        }

        ErrorHandler {
            response: Response::new(header, Some(body)),
        }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Write status-line, the empty line and the message body, then flush
    pub fn send<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        self.response.write_to(out)
    }
}
