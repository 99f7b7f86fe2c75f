//! HTTP header fields
//!
//! A field-name to value map with case-insensitive names. Each name appears
//! at most once: setting a field that is already present replaces its value
//! in place, so the last write wins while the original position is kept.

use super::error::ClientError;
use super::CRLF;
use bytes::{BufMut, BytesMut};
use std::fmt;

/// HTTP header fields collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    fields: Vec<(String, String)>,
}

impl Headers {
    /// Create a new empty collection
    pub fn new() -> Self {
        Headers { fields: Vec::new() }
    }

    /// Set a field, replacing any value already stored under the same name
    ///
    /// Returns the replaced value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        match self
            .fields
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Get a field value (case-insensitive)
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Check if a field exists
    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }

    /// Remove a field (case-insensitive), returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let idx = self
            .fields
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))?;
        Some(self.fields.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Append every field as a `name: value` line
    pub fn write_to(&self, buf: &mut BytesMut) {
        for (name, value) in &self.fields {
            buf.put_slice(name.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(CRLF.as_bytes());
        }
    }

    /// Parse a header line into name and value
    ///
    /// The line is split at the first colon; both halves are trimmed.
    pub fn parse_header_line(line: &str) -> Result<(String, String), ClientError> {
        let Some((name, value)) = line.split_once(':') else {
            return Err(ClientError::bad_request(format!(
                "header field without a colon: {}",
                line
            )));
        };

        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::bad_request("empty header field name"));
        }

        Ok((name.to_string(), value.trim().to_string()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{}: {}{}", name, value, CRLF)?;
        }
        Ok(())
    }
}

impl FromIterator<(String, String)> for Headers {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}
