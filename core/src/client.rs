//! Stateless HTTP request builder and response parser for the users/posts API.
//!
//! # Design
//! `ApiClient` holds only a `base_url` and carries no mutable state between
//! calls. Each endpoint is split into a `build_*` method that produces an
//! `HttpRequest` and a `parse_*` method that consumes an `HttpResponse`.
//! The caller executes the actual HTTP round-trip, keeping the client
//! deterministic and free of I/O dependencies.
//!
//! Query strings follow the backing API exactly: `name_like` for the user
//! filter and one repeated `userId` parameter per id for posts. Values are
//! form-urlencoded so a search term cannot inject extra parameters.

use serde::de::DeserializeOwned;
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{Post, User};

/// Synchronous, stateless client for the users/posts API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET {base}/users?name_like={search}`. An empty term matches everyone.
    pub fn build_list_users(&self, search: &str) -> HttpRequest {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("name_like", search)
            .finish();
        self.get(format!("{}/users?{query}", self.base_url))
    }

    /// `GET {base}/posts?userId={id1}&userId={id2}...`, ids in input order.
    ///
    /// Returns `None` for an empty id set: the API answers an unscoped
    /// `/posts` with every post, so "no users" must mean "no request".
    pub fn build_list_posts(&self, user_ids: &[u64]) -> Option<HttpRequest> {
        if user_ids.is_empty() {
            return None;
        }
        let mut query = form_urlencoded::Serializer::new(String::new());
        for id in user_ids {
            query.append_pair("userId", &id.to_string());
        }
        Some(self.get(format!("{}/posts?{}", self.base_url, query.finish())))
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<User>, ApiError> {
        parse_array(response)
    }

    pub fn parse_list_posts(&self, response: HttpResponse) -> Result<Vec<Post>, ApiError> {
        parse_array(response)
    }

    fn get(&self, url: String) -> HttpRequest {
        HttpRequest {
            url,
            headers: vec![("accept".to_string(), "application/json".to_string())],
        }
    }
}

/// Decode a 2xx response whose body must be a JSON array of `T`.
fn parse_array<T: DeserializeOwned>(response: HttpResponse) -> Result<Vec<T>, ApiError> {
    check_status(&response)?;
    let value: serde_json::Value = serde_json::from_str(&response.body)
        .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
    if !value.is_array() {
        return Err(ApiError::NotAnArray);
    }
    serde_json::from_value(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
}

/// Map non-2xx status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
