//! HTTP error taxonomy
//!
//! Three kinds of failure flow through the HTTP layer:
//!
//! - [`ArgumentError`]: a caller broke an API contract. It never reaches the
//!   wire except as a generic 500.
//! - [`ClientError`]: the peer sent something invalid. Always carries a 4xx
//!   catalog status.
//! - [`ServerError`]: the server could not complete the exchange. Always
//!   carries a 5xx catalog status and optionally the underlying cause.
//!
//! [`Error`] is the tagged union the request path pattern-matches on.

use super::status::{Status, StatusClass};
use std::io;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A violated API contract
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ArgumentError(pub String);

impl ArgumentError {
    pub fn new(message: impl Into<String>) -> Self {
        ArgumentError(message.into())
    }
}

/// A failure caused by the client, mapped to a 4xx status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClientError {
    status: Status,
    message: String,
}

impl ClientError {
    /// Create a client error for a catalog code in the 4xx class
    pub fn new(code: u16, message: impl Into<String>) -> Result<Self, ArgumentError> {
        let status = checked_status(code, StatusClass::ClientError)?;
        Ok(ClientError {
            status,
            message: message.into(),
        })
    }

    fn with_status(status: Status, message: impl Into<String>) -> Self {
        debug_assert!(status.is_client_error());
        ClientError {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(Status::BAD_REQUEST, message)
    }

    /// 408 Request Timeout
    pub fn request_timeout(message: impl Into<String>) -> Self {
        Self::with_status(Status::REQUEST_TIMEOUT, message)
    }

    /// 413 Payload Too Large
    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::with_status(Status::PAYLOAD_TOO_LARGE, message)
    }

    /// 414 URI Too Long
    pub fn uri_too_long(message: impl Into<String>) -> Self {
        Self::with_status(Status::URI_TOO_LONG, message)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A failure on the server side, mapped to a 5xx status
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ServerError {
    status: Status,
    message: String,
    source: Option<Cause>,
}

impl ServerError {
    /// Create a server error for a catalog code in the 5xx class
    pub fn new(code: u16, message: impl Into<String>) -> Result<Self, ArgumentError> {
        let status = checked_status(code, StatusClass::ServerError)?;
        Ok(ServerError {
            status,
            message: message.into(),
            source: None,
        })
    }

    fn with_status(status: Status, message: impl Into<String>) -> Self {
        debug_assert!(status.is_server_error());
        ServerError {
            status,
            message: message.into(),
            source: None,
        }
    }

    /// 500 Internal Server Error caused by `cause`
    pub fn internal(message: impl Into<String>, cause: impl Into<Cause>) -> Self {
        Self::with_status(Status::INTERNAL_SERVER_ERROR, message).caused_by(cause)
    }

    /// 501 Not Implemented
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::with_status(Status::NOT_IMPLEMENTED, message)
    }

    /// 503 Service Unavailable
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::with_status(Status::SERVICE_UNAVAILABLE, message)
    }

    /// Attach the underlying cause
    pub fn caused_by(mut self, cause: impl Into<Cause>) -> Self {
        self.source = Some(cause.into());
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn checked_status(code: u16, class: StatusClass) -> Result<Status, ArgumentError> {
    let status = Status::from_code(code)
        .ok_or_else(|| ArgumentError(format!("{} is not a recognized status code", code)))?;
    if status.class() != class {
        return Err(ArgumentError(format!(
            "status {} is not in class \"{}\"",
            status, class
        )));
    }
    Ok(status)
}

/// Any failure on the request path
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

impl Error {
    /// The status carried by the error, if it has one
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Argument(_) => None,
            Error::Client(e) => Some(e.status()),
            Error::Server(e) => Some(e.status()),
        }
    }

    /// The status to answer with: the carried status, or 500
    pub fn response_status(&self) -> Status {
        self.status().unwrap_or(Status::INTERNAL_SERVER_ERROR)
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                Error::Client(ClientError::request_timeout("timed out waiting for the request"))
            }
            _ => Error::Server(ServerError::internal(format!("I/O error: {}", err), err)),
        }
    }
}
