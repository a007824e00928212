//! Generic request/response abstraction handed to and returned by handlers.
//!
//! These types deliberately know nothing about the Runtime API envelope. The
//! adapter's translator builds a [`Request`] from an invocation event and
//! turns a [`Response`] back into a [`crate::ResponseEnvelope`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Headers
// ---------------------------------------------------------------------------

/// Case-insensitive header map.
///
/// Names are lower-cased on insertion; a later insert of the same name
/// replaces the earlier value. Serialises as a flat JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a header.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Looks up a header by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Removes a header, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// An inbound HTTP-like request, owned by one loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method, upper-case (e.g. `"GET"`).
    pub method: String,
    /// Absolute target URL (`https://{host}{path}`).
    pub url: String,
    /// Request headers, including the `x-amzn-*` invocation metadata headers.
    pub headers: Headers,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
    /// The untouched invocation event, for handlers needing source-specific
    /// fields.
    pub event: serde_json::Value,
}

impl Request {
    /// Returns the body interpreted as UTF-8, if present and valid.
    pub fn text(&self) -> Option<&str> {
        self.body
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    /// Returns the path-and-query portion of [`Request::url`].
    pub fn path(&self) -> &str {
        let after_scheme = self
            .url
            .split_once("://")
            .map_or(self.url.as_str(), |(_, rest)| rest);
        after_scheme
            .find('/')
            .map_or("/", |idx| &after_scheme[idx..])
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// An outbound HTTP-like response produced by handler code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Headers,
    /// Response body; empty for no body.
    pub body: Vec<u8>,
}

impl Response {
    /// A response with the given status, no headers and no body.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    /// A `text/plain;charset=utf-8` response.
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::empty(status)
            .with_header("content-type", "text/plain;charset=utf-8")
            .with_body(body.into().into_bytes())
    }

    /// An `application/json` response serialised from `value`.
    ///
    /// # Errors
    ///
    /// Returns the serialisation error if `value` cannot be encoded.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::empty(status)
            .with_header("content-type", "application/json")
            .with_body(body))
    }

    /// A binary response with no content type; encoded as base64 on the wire.
    pub fn bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self::empty(status).with_body(body.into())
    }

    /// Adds or replaces a header.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }
}
