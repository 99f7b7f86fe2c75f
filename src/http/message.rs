//! HTTP message building blocks
//!
//! Method, request-target and message body types shared by requests and
//! responses.

use super::error::ClientError;
use super::MAX_REQUEST_TARGET_LEN;
use bytes::{Bytes, BytesMut};
use std::fmt;
use std::str::FromStr;

/// HTTP methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
}

impl Method {
    /// Every supported method
    pub const ALL: [Method; 8] = [
        Method::Get,
        Method::Head,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Connect,
        Method::Options,
        Method::Trace,
    ];

    /// Convert method to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Connect => "CONNECT",
            Method::Options => "OPTIONS",
            Method::Trace => "TRACE",
        }
    }
}

/// Method tokens are case-sensitive: `get` is not `GET`.
impl FromStr for Method {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "CONNECT" => Ok(Method::Connect),
            "OPTIONS" => Ok(Method::Options),
            "TRACE" => Ok(Method::Trace),
            _ => Err(ClientError::bad_request(format!("unsupported method: {}", s))),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a request-target (RFC 7230 section 5.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetForm {
    /// `/path?query`
    Origin,
    /// `http://host/path`
    Absolute,
    /// `host:port`, only with CONNECT
    Authority,
    /// `*`, only with OPTIONS
    Asterisk,
}

/// A validated request-target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    target: String,
    form: TargetForm,
}

impl RequestTarget {
    /// Validate `target` for `method`
    ///
    /// Length is checked first and yields 414; a target whose shape does not
    /// fit the method yields 400. CONNECT and OPTIONS accept any target.
    pub fn parse(method: Method, target: &str) -> Result<Self, ClientError> {
        if target.len() > MAX_REQUEST_TARGET_LEN {
            return Err(ClientError::uri_too_long(format!(
                "request-target is {} bytes, the limit is {}",
                target.len(),
                MAX_REQUEST_TARGET_LEN
            )));
        }

        let shaped = shape_of(target);
        let form = match method {
            Method::Connect => TargetForm::Authority,
            Method::Options => shaped.unwrap_or(TargetForm::Asterisk),
            _ => shaped.ok_or_else(|| {
                ClientError::bad_request(format!(
                    "request-target {:?} is neither origin-form nor absolute-form",
                    target
                ))
            })?,
        };

        Ok(RequestTarget {
            target: target.to_string(),
            form,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.target
    }

    pub fn form(&self) -> TargetForm {
        self.form
    }

    /// Path component: the target up to `?`, for origin-form targets
    pub fn path(&self) -> Option<&str> {
        match self.form {
            TargetForm::Origin => Some(self.target.split('?').next().unwrap_or("")),
            _ => None,
        }
    }

    /// Query component after `?`, for origin-form targets
    pub fn query(&self) -> Option<&str> {
        match self.form {
            TargetForm::Origin => self.target.split_once('?').map(|(_, q)| q),
            _ => None,
        }
    }
}

fn shape_of(target: &str) -> Option<TargetForm> {
    if target.starts_with('/') {
        Some(TargetForm::Origin)
    } else if target.starts_with("http://") || target.starts_with("https://") {
        Some(TargetForm::Absolute)
    } else {
        None
    }
}

impl fmt::Display for RequestTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.target)
    }
}

/// Message body bytes, appended verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageBody {
    data: BytesMut,
}

impl MessageBody {
    pub fn new() -> Self {
        MessageBody {
            data: BytesMut::new(),
        }
    }

    /// Append raw bytes
    pub fn append(&mut self, chunk: &[u8]) {
        self.data.extend_from_slice(chunk);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Freeze into an immutable buffer
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }
}

impl From<&[u8]> for MessageBody {
    fn from(bytes: &[u8]) -> Self {
        MessageBody {
            data: BytesMut::from(bytes),
        }
    }
}

impl From<&str> for MessageBody {
    fn from(text: &str) -> Self {
        MessageBody::from(text.as_bytes())
    }
}

impl From<String> for MessageBody {
    fn from(text: String) -> Self {
        MessageBody::from(text.as_bytes())
    }
}

impl From<Vec<u8>> for MessageBody {
    fn from(bytes: Vec<u8>) -> Self {
        MessageBody::from(bytes.as_slice())
    }
}
