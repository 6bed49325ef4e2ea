//! Error types for swaddle.

use derive_more::{Display, Error, From};

/// Main error type for swaddle operations.
///
/// Observational wrappers (event, metrics) always re-raise the exact error
/// they observed. The retry wrapper is the only component allowed to recover
/// a failure locally, and it surfaces the final error unchanged once retries
/// are exhausted.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// HTTP-level transport failure (carries the status code).
    #[display("HTTP error {status}: {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Network/connection failure from the transport.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// Connection or request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// Failure reported by the cache store collaborator.
    ///
    /// Never swallowed: a store failure propagates to the caller rather
    /// than degrading into a stale or partial response.
    #[display("cache store error: {_0}")]
    #[from(skip)]
    Cache(#[error(not(source))] String),

    /// A wrapper name was used that is not present in the registry.
    #[display("unknown wrapper: {_0:?}")]
    #[from(skip)]
    UnknownWrapper(#[error(not(source))] String),

    /// Invalid wrapper configuration, detected at wrap time.
    #[display("invalid configuration: {_0}")]
    #[from(skip)]
    Configuration(#[error(not(source))] String),

    /// Invalid request construction.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON deserialization error.
    #[display("JSON error: {_0}")]
    #[from]
    Json(serde_json::Error),

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error from status code and message.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a cache store error.
    #[must_use]
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create an unknown-wrapper error.
    #[must_use]
    pub fn unknown_wrapper(name: impl Into<String>) -> Self {
        Self::UnknownWrapper(name.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }
}
