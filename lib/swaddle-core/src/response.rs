//! HTTP response handling.
//!
//! [`Response`] provides access to status, headers, and body with JSON/text
//! deserialization.
//!
//! # Example
//!
//! ```ignore
//! let user: User = response.json()?;
//! ```

use std::collections::HashMap;

use bytes::Bytes;

use crate::{Error, Result};

/// An HTTP response with status, headers, and a buffered body.
///
/// Responses are `Clone` so the cache wrapper can store one copy and hand
/// another back to the caller.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Response {
    /// Creates a new response.
    #[must_use]
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Single header value by name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Response body bytes.
    #[must_use]
    pub const fn body(&self) -> &Bytes {
        &self.body
    }

    /// Status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Status is 4xx.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        self.status >= 400 && self.status < 500
    }

    /// Status is 5xx.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        self.status >= 500 && self.status < 600
    }

    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(Error::from)
    }

    /// Interprets the body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| Error::invalid_request(format!("response body is not UTF-8: {e}")))
    }

    /// Consume into the body bytes.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }
}
