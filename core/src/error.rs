//! Error types for the feed client and orchestrator.
//!
//! # Design
//! Two layers. `ApiError` describes what went wrong on a single request and
//! is kept for logs. `FetchError` is what the presentation layer sees: a
//! fixed, call-site-specific message with the `ApiError` attached as its
//! source. `NotFound` keeps its own variant because a missing endpoint is
//! usually a wrong base URL rather than a server fault.

use thiserror::Error;

/// Errors returned by `ApiClient` parse methods and by transports.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a status other than 200 and 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The body was valid JSON but not an array.
    #[error("response body is not a JSON array")]
    NotAnArray,

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),
}

/// Categorical failure of one fetch cycle.
///
/// `Display` yields only the fixed message; the cause stays in `source()`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Failed to fetch user data")]
    Users(#[source] ApiError),

    #[error("Failed to fetch user posts data")]
    Posts(#[source] ApiError),

    /// A panic while fetching or merging. Carries the panic payload text.
    #[error("Unexpected error while loading data")]
    Unexpected(String),
}
