//! Fetch, join and publish users with their latest post.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). A `Transport` performs the
//! round-trips; the `Orchestrator` sequences them, merges the results with
//! the join engine and publishes a single `FetchState`.
//!
//! # Design
//! - `ApiClient` is stateless; it holds only `base_url`.
//! - `join` is pure and linear: posts are grouped by author first, then each
//!   user takes the highest-`id` post of their group.
//! - The orchestrator is the only writer of `FetchState`. Readers subscribe
//!   to a `watch` channel; only the latest started invocation may publish.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod error;
pub mod http;
pub mod join;
pub mod orchestrator;
pub mod search;
pub mod state;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, FetchError};
pub use http::{HttpRequest, HttpResponse};
pub use join::join;
pub use orchestrator::{Orchestrator, Publication, Snapshot};
pub use search::{search_term, SearchForm, SEARCH_FIELD};
pub use state::FetchState;
pub use transport::{Transport, UreqTransport};
pub use types::{Address, CombinedRecord, Company, Coordinates, Post, Profile, User};
