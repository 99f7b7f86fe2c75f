//! Response model
//!
//! A response is a status-line, header fields, an empty line and an
//! optional body. Status-lines are only built from catalog statuses, so the
//! code and reason phrase on the wire always agree.

use super::error::{ArgumentError, Error};
use super::headers::Headers;
use super::message::{MessageBody, Method};
use super::request::VERSION_PATTERN;
use super::status::Status;
use super::{CRLF, HTTP_VERSION, MAX_REASON_PHRASE_LEN, SERVER_NAME, SP};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// `HTTP-version SP status-code SP reason-phrase CRLF`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    status: Status,
    line: String,
}

impl StatusLine {
    /// Build the status-line for a catalog status
    pub fn new(status: Status) -> Self {
        let line = format!(
            "{}{}{}{}{}{}",
            HTTP_VERSION,
            SP,
            status.code(),
            SP,
            status.reason_phrase(),
            CRLF
        );
        StatusLine { status, line }
    }

    /// Build the status-line for a failure: its own status, or 500
    pub fn for_error(err: &Error) -> Self {
        Self::new(err.response_status())
    }

    /// Validate a status-line as it would appear on the wire
    ///
    /// The reason phrase may contain spaces but must match the catalog
    /// phrase for the code exactly.
    pub fn validate(line: &str) -> Result<Status, ArgumentError> {
        if line.trim().is_empty() {
            return Err(ArgumentError::new("status-line must not be blank"));
        }
        let Some(content) = line.strip_suffix(CRLF) else {
            return Err(ArgumentError::new("status-line must end with CRLF"));
        };

        let mut parts = content.splitn(3, SP);
        let (Some(version), Some(code), Some(phrase)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ArgumentError::new(format!(
                "status-line {:?} does not have three parts",
                content
            )));
        };

        if !VERSION_PATTERN.is_match(version) {
            return Err(ArgumentError::new(format!("malformed HTTP version: {}", version)));
        }
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ArgumentError::new(format!("malformed status code: {}", code)));
        }
        let status = code
            .parse::<u16>()
            .ok()
            .and_then(Status::from_code)
            .ok_or_else(|| ArgumentError::new(format!("unrecognized status code: {}", code)))?;

        if phrase.len() > MAX_REASON_PHRASE_LEN {
            return Err(ArgumentError::new(format!(
                "reason phrase is longer than {} bytes",
                MAX_REASON_PHRASE_LEN
            )));
        }
        if phrase != status.reason_phrase() {
            return Err(ArgumentError::new(format!(
                "reason phrase {:?} does not match {}",
                phrase, status
            )));
        }

        Ok(status)
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The line including its CRLF
    pub fn as_str(&self) -> &str {
        &self.line
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.line)
    }
}

/// Status-line plus header fields
#[derive(Debug, Clone)]
pub struct ResponseHeader {
    status_line: StatusLine,
    fields: Headers,
}

impl ResponseHeader {
    pub fn new(status: Status) -> Self {
        Self::with_status_line(StatusLine::new(status))
    }

    pub fn with_status_line(status_line: StatusLine) -> Self {
        ResponseHeader {
            status_line,
            fields: Headers::new(),
        }
    }

    /// Set a header field
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.insert(name, value);
        self
    }

    /// `Date` set to now
    pub fn add_current_date(&mut self) -> &mut Self {
        self.add_field("Date", format_http_date(SystemTime::now()))
    }

    /// `Server` naming this crate and version
    pub fn add_server(&mut self) -> &mut Self {
        self.add_field("Server", SERVER_NAME)
    }

    pub fn add_content_length(&mut self, len: usize) -> &mut Self {
        self.add_field("Content-Length", len.to_string())
    }

    pub fn add_content_type(&mut self, media_type: &str) -> &mut Self {
        self.add_field("Content-Type", media_type)
    }

    /// `Allow` listing the given methods
    pub fn add_allow(&mut self, methods: &[Method]) -> &mut Self {
        let list = methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        self.add_field("Allow", list)
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.status_line
    }

    pub fn status(&self) -> Status {
        self.status_line.status()
    }

    pub fn fields(&self) -> &Headers {
        &self.fields
    }
}

/// A complete response
#[derive(Debug, Clone)]
pub struct Response {
    header: ResponseHeader,
    body: Option<MessageBody>,
}

impl Response {
    pub fn new(header: ResponseHeader, body: Option<MessageBody>) -> Self {
        Response { header, body }
    }

    pub fn header(&self) -> &ResponseHeader {
        &self.header
    }

    pub fn status(&self) -> Status {
        self.header.status()
    }

    pub fn body(&self) -> Option<&MessageBody> {
        self.body.as_ref()
    }

    /// Serialize to wire format
    pub fn to_wire(&self) -> Bytes {
        let body_len = self.body.as_ref().map_or(0, MessageBody::len);
        let mut buf = BytesMut::with_capacity(256 + body_len);

        buf.put_slice(self.header.status_line.as_str().as_bytes());
        self.header.fields.write_to(&mut buf);
        buf.put_slice(CRLF.as_bytes());
        if let Some(body) = &self.body {
            buf.put_slice(body.as_bytes());
        }

        buf.freeze()
    }

    /// Write the serialized response and flush
    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.to_wire())?;
        out.flush()
    }
}

/// Format a timestamp as an RFC 7231 IMF-fixdate
pub fn format_http_date(time: SystemTime) -> String {
    const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    const MONTH_NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];

    // times before the epoch clamp to it
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    format!(
        "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
        DAY_NAMES[((days + 4) % 7) as usize],
        day,
        MONTH_NAMES[(month - 1) as usize],
        year,
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60
    )
}

/// Days since 1970-01-01 to (year, month, day)
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // shift the epoch to 0000-03-01 so leap days fall at the end of an era year
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}
