//! Error types for refprune-registry

use std::sync::Arc;
use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for registry operations
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON deserialization failed
    #[error("Failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid URL format
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Server answered with a non-success status
    #[error("HTTP request failed with status {status}: {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Package (or package version) not found in registry
    #[error("Package '{0}' not found in {1}")]
    PackageNotFound(String, String),

    /// Package exists but no acceptable version was published
    #[error("No acceptable versions of '{0}' published")]
    NoVersions(String),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded for URL: {0}")]
    RateLimitExceeded(String),

    /// Service index lacks a resource refprune needs
    #[error("Service index {source_url} does not advertise a {service} resource")]
    MissingService {
        /// Service index URL
        source_url: String,
        /// Resource type that was searched for
        service: &'static str,
    },

    /// Service index could not be fetched or parsed
    #[error("Failed to load service index {source_url}: {source}")]
    ServiceIndex {
        /// Service index URL
        source_url: String,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Failure shared by every caller of a coalesced fetch
    #[error(transparent)]
    Cached(Arc<Error>),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a new generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// The underlying error, looking through cache wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Cached(inner) => inner.root(),
            other => other,
        }
    }

    /// Configuration failures abort a run; every other registry error only
    /// affects the package being resolved.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.root(),
            Error::MissingService { .. } | Error::ServiceIndex { .. }
        )
    }
}
