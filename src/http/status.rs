//! Status catalog
//!
//! The closed set of status codes this server recognizes, with their
//! canonical reason phrases. A [`Status`] can only be obtained from the
//! catalog, so every status that reaches the wire has a known phrase.

use std::fmt;

/// Status class, derived from the leading digit of the code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Informational,
    Successful,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    /// Classify a code by its leading digit
    pub const fn of(code: u16) -> Option<Self> {
        match code / 100 {
            1 => Some(StatusClass::Informational),
            2 => Some(StatusClass::Successful),
            3 => Some(StatusClass::Redirection),
            4 => Some(StatusClass::ClientError),
            5 => Some(StatusClass::ServerError),
            _ => None,
        }
    }

    /// Human readable class name
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusClass::Informational => "Informational",
            StatusClass::Successful => "Successful",
            StatusClass::Redirection => "Redirection",
            StatusClass::ClientError => "Client Error",
            StatusClass::ServerError => "Server Error",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recognized status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status {
    code: u16,
    phrase: &'static str,
}

impl Status {
    const fn entry(code: u16, phrase: &'static str) -> Self {
        Status { code, phrase }
    }

    pub const CONTINUE: Status = Status::entry(100, "Continue");
    pub const SWITCHING_PROTOCOLS: Status = Status::entry(101, "Switching Protocols");
    pub const OK: Status = Status::entry(200, "OK");
    pub const CREATED: Status = Status::entry(201, "Created");
    pub const ACCEPTED: Status = Status::entry(202, "Accepted");
    pub const NON_AUTHORITATIVE_INFORMATION: Status =
        Status::entry(203, "Non-Authoritative Information");
    pub const NO_CONTENT: Status = Status::entry(204, "No Content");
    pub const RESET_CONTENT: Status = Status::entry(205, "Reset Content");
    pub const MULTIPLE_CHOICES: Status = Status::entry(300, "Multiple Choices");
    pub const MOVED_PERMANENTLY: Status = Status::entry(301, "Moved Permanently");
    pub const FOUND: Status = Status::entry(302, "Found");
    pub const SEE_OTHER: Status = Status::entry(303, "See Other");
    pub const USE_PROXY: Status = Status::entry(305, "Use Proxy");
    pub const UNUSED: Status = Status::entry(306, "Unused");
    pub const TEMPORARY_REDIRECT: Status = Status::entry(307, "Temporary Redirect");
    pub const BAD_REQUEST: Status = Status::entry(400, "Bad Request");
    pub const PAYMENT_REQUIRED: Status = Status::entry(402, "Payment Required");
    pub const FORBIDDEN: Status = Status::entry(403, "Forbidden");
    pub const NOT_FOUND: Status = Status::entry(404, "Not Found");
    pub const METHOD_NOT_ALLOWED: Status = Status::entry(405, "Method Not Allowed");
    pub const NOT_ACCEPTABLE: Status = Status::entry(406, "Not Acceptable");
    pub const REQUEST_TIMEOUT: Status = Status::entry(408, "Request Timeout");
    pub const CONFLICT: Status = Status::entry(409, "Conflict");
    pub const GONE: Status = Status::entry(410, "Gone");
    pub const LENGTH_REQUIRED: Status = Status::entry(411, "Length Required");
    pub const PAYLOAD_TOO_LARGE: Status = Status::entry(413, "Payload Too Large");
    pub const URI_TOO_LONG: Status = Status::entry(414, "URI Too Long");
    pub const UNSUPPORTED_MEDIA_TYPE: Status = Status::entry(415, "Unsupported Media Type");
    pub const EXPECTATION_FAILED: Status = Status::entry(417, "Expectation Failed");
    pub const UPGRADE_REQUIRED: Status = Status::entry(426, "Upgrade Required");
    pub const INTERNAL_SERVER_ERROR: Status = Status::entry(500, "Internal Server Error");
    pub const NOT_IMPLEMENTED: Status = Status::entry(501, "Not Implemented");
    pub const BAD_GATEWAY: Status = Status::entry(502, "Bad Gateway");
    pub const SERVICE_UNAVAILABLE: Status = Status::entry(503, "Service Unavailable");
    pub const GATEWAY_TIMEOUT: Status = Status::entry(504, "Gateway Timeout");
    pub const HTTP_VERSION_NOT_SUPPORTED: Status =
        Status::entry(505, "HTTP Version Not Supported");

    /// Look up a status by its numeric code
    pub fn from_code(code: u16) -> Option<Status> {
        CATALOG
            .binary_search_by_key(&code, |s| s.code)
            .ok()
            .map(|idx| CATALOG[idx])
    }

    /// Look up a status by its reason phrase, ignoring ASCII case
    pub fn from_reason_phrase(phrase: &str) -> Option<Status> {
        CATALOG
            .iter()
            .find(|s| s.phrase.eq_ignore_ascii_case(phrase))
            .copied()
    }

    /// The lowest catalog entry belonging to `class`
    pub fn first_of_class(class: StatusClass) -> Option<Status> {
        CATALOG.iter().find(|s| s.class() == class).copied()
    }

    /// Every recognized status, ordered by code
    pub fn all() -> &'static [Status] {
        &CATALOG
    }

    /// Get the status code
    pub fn code(&self) -> u16 {
        self.code
    }

    /// Get the canonical reason phrase
    pub fn reason_phrase(&self) -> &'static str {
        self.phrase
    }

    /// Get the status class
    pub fn class(&self) -> StatusClass {
        match StatusClass::of(self.code) {
            Some(class) => class,
            // catalog codes are all in 100..=599
            None => StatusClass::ServerError,
        }
    }

    pub fn is_informational(&self) -> bool {
        self.class() == StatusClass::Informational
    }

    pub fn is_success(&self) -> bool {
        self.class() == StatusClass::Successful
    }

    pub fn is_redirection(&self) -> bool {
        self.class() == StatusClass::Redirection
    }

    pub fn is_client_error(&self) -> bool {
        self.class() == StatusClass::ClientError
    }

    pub fn is_server_error(&self) -> bool {
        self.class() == StatusClass::ServerError
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.phrase)
    }
}

static CATALOG: [Status; 36] = [
    Status::CONTINUE,
    Status::SWITCHING_PROTOCOLS,
    Status::OK,
    Status::CREATED,
    Status::ACCEPTED,
    Status::NON_AUTHORITATIVE_INFORMATION,
    Status::NO_CONTENT,
    Status::RESET_CONTENT,
    Status::MULTIPLE_CHOICES,
    Status::MOVED_PERMANENTLY,
    Status::FOUND,
    Status::SEE_OTHER,
    Status::USE_PROXY,
    Status::UNUSED,
    Status::TEMPORARY_REDIRECT,
    Status::BAD_REQUEST,
    Status::PAYMENT_REQUIRED,
    Status::FORBIDDEN,
    Status::NOT_FOUND,
    Status::METHOD_NOT_ALLOWED,
    Status::NOT_ACCEPTABLE,
    Status::REQUEST_TIMEOUT,
    Status::CONFLICT,
    Status::GONE,
    Status::LENGTH_REQUIRED,
    Status::PAYLOAD_TOO_LARGE,
    Status::URI_TOO_LONG,
    Status::UNSUPPORTED_MEDIA_TYPE,
    Status::EXPECTATION_FAILED,
    Status::UPGRADE_REQUIRED,
    Status::INTERNAL_SERVER_ERROR,
    Status::NOT_IMPLEMENTED,
    Status::BAD_GATEWAY,
    Status::SERVICE_UNAVAILABLE,
    Status::GATEWAY_TIMEOUT,
    Status::HTTP_VERSION_NOT_SUPPORTED,
];
