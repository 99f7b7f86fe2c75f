//! Request model and request-line validation

use super::error::{ArgumentError, ClientError, Error};
use super::fields::FieldName;
use super::headers::Headers;
use super::message::{MessageBody, Method, RequestTarget};
use super::{CRLF, HTTP_VERSION, SP};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::{info, trace};

pub(crate) static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HTTP/[0-9]\.[0-9]$").expect("version pattern compiles"));

/// A validated request-line: `method SP request-target SP HTTP-version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    line: String,
    method: Method,
    target: RequestTarget,
    version: String,
}

impl RequestLine {
    /// Parse and validate a request-line
    ///
    /// A trailing CRLF is tolerated. A blank line is a caller error; every
    /// other malformation is a client error (400, or 414 for an overlong
    /// target).
    pub fn parse(line: &str) -> Result<Self, Error> {
        let line = line.strip_suffix(CRLF).unwrap_or(line);
        if line.trim().is_empty() {
            return Err(ArgumentError::new("request-line must not be blank").into());
        }

        let tokens: Vec<&str> = line.split(SP).collect();
        if tokens.len() != 3 {
            return Err(ClientError::bad_request(format!(
                "request-line has {} space-separated parts, expected 3",
                tokens.len()
            ))
            .into());
        }
        if tokens
            .iter()
            .any(|t| t.is_empty() || t.chars().any(char::is_whitespace))
        {
            return Err(ClientError::bad_request("malformed request-line").into());
        }

        let method: Method = tokens[0].parse()?;
        let target = RequestTarget::parse(method, tokens[1])?;

        let version = tokens[2];
        if !VERSION_PATTERN.is_match(version) {
            return Err(
                ClientError::bad_request(format!("malformed HTTP version: {}", version)).into(),
            );
        }

        Ok(RequestLine {
            line: line.to_string(),
            method,
            target,
            version: version.to_string(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &RequestTarget {
        &self.target
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The line as received, without its line terminator
    pub fn as_str(&self) -> &str {
        &self.line
    }
}

impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Request-line plus header fields
#[derive(Debug, Clone)]
pub struct RequestHeader {
    request_line: RequestLine,
    fields: Headers,
}

impl RequestHeader {
    pub fn new(request_line: RequestLine) -> Self {
        RequestHeader {
            request_line,
            fields: Headers::new(),
        }
    }

    /// Add a header field; a repeated name replaces the earlier value
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !FieldName::is_supported(&name) {
            info!("header field [{}] is not supported", name);
        }
        self.fields.insert(name, value);
    }

    /// Check the header block against the version rules
    ///
    /// An HTTP/1.1 request must carry a Host field.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.request_line.version() == HTTP_VERSION && !self.fields.contains("Host") {
            return Err(ClientError::bad_request(
                "A client MUST include a Host header field in all HTTP/1.1 request messages",
            ));
        }
        Ok(())
    }

    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    pub fn fields(&self) -> &Headers {
        &self.fields
    }
}

/// A complete request
#[derive(Debug, Clone)]
pub struct Request {
    header: RequestHeader,
    body: Option<MessageBody>,
}

impl Request {
    /// Build a request from a header that passes [`RequestHeader::validate`]
    pub fn new(header: RequestHeader, body: Option<MessageBody>) -> Result<Self, ClientError> {
        header.validate()?;
        Ok(Request { header, body })
    }

    pub fn method(&self) -> Method {
        self.header.request_line.method()
    }

    pub fn target(&self) -> &RequestTarget {
        self.header.request_line.target()
    }

    pub fn version(&self) -> &str {
        self.header.request_line.version()
    }

    pub fn header(&self) -> &RequestHeader {
        &self.header
    }

    pub fn headers(&self) -> &Headers {
        &self.header.fields
    }

    pub fn body(&self) -> Option<&MessageBody> {
        self.body.as_ref()
    }

    /// Log the request head at trace level
    pub fn trace(&self) {
        trace!(
            method = %self.method(),
            target = %self.target(),
            version = self.version(),
            "request"
        );
        for (name, value) in self.headers().iter() {
            trace!("  {}: {}", name, value);
        }
        if let Some(body) = &self.body {
            trace!("  body: {} bytes", body.len());
        }
    }
}
