//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! `ApiClient` builds `HttpRequest` values and parses `HttpResponse` values
//! without touching the network; a `Transport` executes them. This keeps the
//! client deterministic and lets tests script the network.
//!
//! The API is read-only, so every request is a `GET` and carries no body.

/// A `GET` request described as plain data.
///
/// Built by `ApiClient::build_*` methods. `url` is absolute and already
/// carries its encoded query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// An HTTP response described as plain data.
///
/// Constructed by a transport after executing an `HttpRequest`, then passed
/// to `ApiClient::parse_*` methods for deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[cfg(test)]
impl HttpResponse {
    /// A 200 response with a JSON body and no headers.
    pub(crate) fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}
