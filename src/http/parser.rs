//! Request reading
//!
//! Turns a buffered byte stream into one [`Request`]: a request-line, header
//! lines up to the first empty line, then the body according to the
//! configured [`BodyFraming`].

use super::error::{ClientError, Error, ServerError};
use super::headers::Headers;
use super::message::{MessageBody, Method};
use super::request::{Request, RequestHeader, RequestLine};
use super::{MAX_HEADERS, MAX_LINE_LEN, MAX_REQUEST_TARGET_LEN, SP};
use std::io::{self, BufRead, Read};
use tracing::trace;

/// How the end of a request body is found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BodyFraming {
    /// Exactly `Content-Length` bytes; no body without the field
    #[default]
    ContentLength,
    /// Everything until the peer shuts down its side of the connection
    UntilClose,
}

/// Limits applied while reading a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserConfig {
    pub framing: BodyFraming,
    pub max_body_bytes: usize,
    pub max_line_len: usize,
    pub max_headers: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            framing: BodyFraming::default(),
            max_body_bytes: 1024 * 1024,
            max_line_len: MAX_LINE_LEN,
            max_headers: MAX_HEADERS,
        }
    }
}

/// Reads one request from a buffered stream
pub struct RequestReader<R> {
    reader: R,
    config: ParserConfig,
}

impl<R: BufRead> RequestReader<R> {
    pub fn new(reader: R, config: ParserConfig) -> Self {
        RequestReader { reader, config }
    }

    /// Read and validate a whole request
    pub fn read_request(&mut self) -> Result<Request, Error> {
        let line = match self.read_line()? {
            Line::Text(line) => line,
            Line::TooLong(prefix) => return Err(self.overlong_request_line(&prefix).into()),
            Line::Eof => {
                return Err(
                    ClientError::bad_request("connection closed before a request-line").into(),
                )
            }
        };
        if line.trim().is_empty() {
            return Err(ClientError::bad_request("blank request-line").into());
        }
        trace!("request-line: {}", line);

        let mut header = RequestHeader::new(RequestLine::parse(&line)?);
        let mut count = 0;
        loop {
            let line = match self.read_line()? {
                Line::Text(line) => line,
                Line::TooLong(_) => {
                    return Err(ClientError::bad_request(format!(
                        "header field line is longer than {} bytes",
                        self.config.max_line_len
                    ))
                    .into())
                }
                Line::Eof => break,
            };
            if line.is_empty() {
                break;
            }

            count += 1;
            if count > self.config.max_headers {
                return Err(ClientError::bad_request(format!(
                    "more than {} header fields",
                    self.config.max_headers
                ))
                .into());
            }

            let (name, value) = Headers::parse_header_line(&line)?;
            header.add_field(name, value);
        }
        header.validate()?;

        let body = match self.config.framing {
            BodyFraming::ContentLength => self.read_sized_body(header.fields())?,
            BodyFraming::UntilClose => self.read_body_until_close()?,
        };

        Ok(Request::new(header, body)?)
    }

    /// Consume the reader and return the underlying stream
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Classify a request-line that did not fit the line limit
    ///
    /// Only a known method followed by a target that runs past the limit is
    /// 414; an oversized method or version token is a malformed line.
    fn overlong_request_line(&self, prefix: &[u8]) -> ClientError {
        let prefix = String::from_utf8_lossy(prefix);
        let mut tokens = prefix.splitn(3, SP);
        let known_method = tokens
            .next()
            .is_some_and(|method| method.parse::<Method>().is_ok());
        let target_too_long = match (tokens.next(), tokens.next()) {
            (Some(target), None) => !target.is_empty(),
            (Some(target), Some(_)) => target.len() > MAX_REQUEST_TARGET_LEN,
            _ => false,
        };

        if known_method && target_too_long {
            ClientError::uri_too_long(format!(
                "request-line is longer than {} bytes",
                self.config.max_line_len
            ))
        } else {
            ClientError::bad_request(format!(
                "malformed request-line longer than {} bytes",
                self.config.max_line_len
            ))
        }
    }

    fn read_line(&mut self) -> Result<Line, Error> {
        let limit = self.config.max_line_len;
        let mut buf = Vec::new();
        let n = self
            .reader
            .by_ref()
            .take(limit as u64 + 2)
            .read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(Line::Eof);
        }

        let terminated = buf.ends_with(b"\n");
        if terminated {
            buf.pop();
            if buf.ends_with(b"\r") {
                buf.pop();
            }
        }
        if buf.len() > limit || (!terminated && n == limit + 2) {
            return Ok(Line::TooLong(buf));
        }

        String::from_utf8(buf)
            .map(Line::Text)
            .map_err(|_| ClientError::bad_request("request head is not valid UTF-8").into())
    }

    fn read_sized_body(&mut self, fields: &Headers) -> Result<Option<MessageBody>, Error> {
        if fields.contains("Transfer-Encoding") {
            return Err(ServerError::not_implemented("transfer codings are not supported").into());
        }
        let Some(value) = fields.get("Content-Length") else {
            return Ok(None);
        };

        let len: usize = match value.parse() {
            Ok(len) if value.bytes().all(|b| b.is_ascii_digit()) => len,
            _ => {
                return Err(
                    ClientError::bad_request(format!("invalid Content-Length: {}", value)).into(),
                )
            }
        };
        if len > self.config.max_body_bytes {
            return Err(ClientError::payload_too_large(format!(
                "body of {} bytes exceeds the limit of {}",
                len, self.config.max_body_bytes
            ))
            .into());
        }

        let mut data = vec![0u8; len];
        match self.reader.read_exact(&mut data) {
            Ok(()) => Ok(Some(MessageBody::from(data))),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(ClientError::bad_request(
                format!("body ended before {} bytes were received", len),
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_body_until_close(&mut self) -> Result<Option<MessageBody>, Error> {
        let limit = self.config.max_body_bytes;
        let mut data = Vec::new();
        self.reader
            .by_ref()
            .take(limit as u64 + 1)
            .read_to_end(&mut data)?;
        if data.len() > limit {
            return Err(ClientError::payload_too_large(format!(
                "body exceeds the limit of {} bytes",
                limit
            ))
            .into());
        }

        Ok((!data.is_empty()).then(|| MessageBody::from(data)))
    }
}

enum Line {
    Text(String),
    /// What was read of a line over the limit
    TooLong(Vec<u8>),
    Eof,
}
