//! Header-field registry
//!
//! The standard field names this server knows about. The registry is
//! advisory: unknown fields are accepted, only logged.

/// Where a field may appear
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    General,
    Request,
    Response,
    Entity,
}

/// A registered header field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldName {
    name: &'static str,
    kind: FieldKind,
}

impl FieldName {
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        FieldName { name, kind }
    }

    /// Find a registered field, ignoring ASCII case
    pub fn lookup(name: &str) -> Option<FieldName> {
        REGISTRY
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
            .copied()
    }

    /// Whether `name` is a registered field
    pub fn is_supported(name: &str) -> bool {
        Self::lookup(name).is_some()
    }

    /// Canonical spelling of the field name
    pub fn as_str(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    /// Valid in a request (general, request and entity fields)
    pub fn is_request_field(&self) -> bool {
        self.kind != FieldKind::Response
    }

    /// Valid in a response (general, response and entity fields)
    pub fn is_response_field(&self) -> bool {
        self.kind != FieldKind::Request
    }
}

use FieldKind::{Entity, General, Request, Response};

static REGISTRY: [FieldName; 47] = [
    FieldName::new("Accept", Request),
    FieldName::new("Accept-Charset", Request),
    FieldName::new("Accept-Encoding", Request),
    FieldName::new("Accept-Language", Request),
    FieldName::new("Accept-Ranges", Response),
    FieldName::new("Age", Response),
    FieldName::new("Allow", Entity),
    FieldName::new("Authorization", Request),
    FieldName::new("Cache-Control", General),
    FieldName::new("Connection", General),
    FieldName::new("Content-Encoding", Entity),
    FieldName::new("Content-Language", Entity),
    FieldName::new("Content-Length", Entity),
    FieldName::new("Content-Location", Entity),
    FieldName::new("Content-MD5", Entity),
    FieldName::new("Content-Range", Entity),
    FieldName::new("Content-Type", Entity),
    FieldName::new("Date", General),
    FieldName::new("ETag", Response),
    FieldName::new("Expect", Request),
    FieldName::new("Expires", Entity),
    FieldName::new("From", Request),
    FieldName::new("Host", Request),
    FieldName::new("If-Match", Request),
    FieldName::new("If-Modified-Since", Request),
    FieldName::new("If-None-Match", Request),
    FieldName::new("If-Range", Request),
    FieldName::new("If-Unmodified-Since", Request),
    FieldName::new("Last-Modified", Entity),
    FieldName::new("Location", Response),
    FieldName::new("Max-Forwards", Request),
    FieldName::new("Pragma", General),
    FieldName::new("Proxy-Authenticate", Response),
    FieldName::new("Proxy-Authorization", Request),
    FieldName::new("Range", Request),
    FieldName::new("Referer", Request),
    FieldName::new("Retry-After", Response),
    FieldName::new("Server", Response),
    FieldName::new("TE", Request),
    FieldName::new("Trailer", General),
    FieldName::new("Transfer-Encoding", General),
    FieldName::new("Upgrade", General),
    FieldName::new("User-Agent", Request),
    FieldName::new("Vary", Response),
    FieldName::new("Via", General),
    FieldName::new("Warning", General),
    FieldName::new("WWW-Authenticate", Response),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_case_insensitive() {
        let host = FieldName::lookup("host").unwrap();
        assert_eq!(host.as_str(), "Host");
        assert_eq!(host.kind(), FieldKind::Request);
        assert!(FieldName::is_supported("CONTENT-LENGTH"));
        assert!(FieldName::is_supported("www-authenticate"));
        assert!(!FieldName::is_supported("X-Request-Id"));
    }

    #[test]
    fn test_field_direction() {
        let server = FieldName::lookup("Server").unwrap();
        assert!(server.is_response_field());
        assert!(!server.is_request_field());

        let date = FieldName::lookup("Date").unwrap();
        assert!(date.is_request_field() && date.is_response_field());

        let content_type = FieldName::lookup("Content-Type").unwrap();
        assert!(content_type.is_request_field() && content_type.is_response_field());
    }

    #[test]
    fn test_registry_names_unique() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in &REGISTRY[i + 1..] {
                assert!(!a.as_str().eq_ignore_ascii_case(b.as_str()), "duplicate {}", a.as_str());
            }
        }
    }
}
