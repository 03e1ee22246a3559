//! Drives one fetch cycle per search term and publishes the outcome.
//!
//! # Design
//! A cycle is two dependent requests: users matching the term, then posts
//! scoped to exactly those users' ids. The merged records (or a categorical
//! error) are published through a `watch` channel holding a `Snapshot`.
//!
//! Every invocation takes a sequence number when it starts. Bumping the
//! sequence and entering `Loading` happen in one write to the channel, and
//! publishing re-checks the sequence inside the write that stores the result.
//! A completion whose sequence is no longer the latest is dropped, so a slow
//! earlier search can never overwrite a newer one. `run` additionally aborts
//! the task of the invocation it supersedes.

use std::any::Any;
use std::error::Error as _;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::ApiClient;
use crate::error::{ApiError, FetchError};
use crate::join::join;
use crate::state::FetchState;
use crate::transport::Transport;
use crate::types::{CombinedRecord, Post, User};

/// What the presentation layer observes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Sequence number of the latest initiated invocation; 0 before any.
    pub sequence: u64,
    /// Search term of that invocation.
    pub search_term: String,
    pub state: FetchState,
}

/// Whether a finished invocation got to publish its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publication {
    Published,
    /// A newer invocation started first; the outcome was discarded.
    Superseded,
}

pub struct Orchestrator<T> {
    inner: Arc<Inner<T>>,
    in_flight: Option<JoinHandle<Publication>>,
}

struct Inner<T> {
    client: ApiClient,
    transport: T,
    snapshot: watch::Sender<Snapshot>,
}

impl<T: Transport + 'static> Orchestrator<T> {
    pub fn new(client: ApiClient, transport: T) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Self {
            inner: Arc::new(Inner {
                client,
                transport,
                snapshot,
            }),
            in_flight: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn state(&self) -> FetchState {
        self.inner.snapshot.borrow().state.clone()
    }

    pub fn search_term(&self) -> String {
        self.inner.snapshot.borrow().search_term.clone()
    }

    /// Run one invocation to completion on the caller's task.
    ///
    /// Concurrent calls are allowed; only the most recently started one
    /// publishes.
    pub async fn fetch(&self, search: impl Into<String>) -> Publication {
        let search = search.into();
        let sequence = self.inner.begin(&search);
        Arc::clone(&self.inner).settle(sequence, search).await
    }

    /// Start an invocation in the background and return its sequence number.
    ///
    /// Aborts the invocation previously started by `run`, if it is still in
    /// flight. Must be called from within a Tokio runtime.
    pub fn run(&mut self, search: impl Into<String>) -> u64 {
        let search = search.into();
        let sequence = self.inner.begin(&search);
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        let inner = Arc::clone(&self.inner);
        self.in_flight = Some(tokio::spawn(inner.settle(sequence, search)));
        sequence
    }
}

impl<T> Drop for Orchestrator<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

impl<T: Transport> Inner<T> {
    /// Take the next sequence number and enter `Loading` in one write.
    fn begin(&self, search: &str) -> u64 {
        let mut sequence = 0;
        self.snapshot.send_modify(|snapshot| {
            snapshot.sequence += 1;
            snapshot.search_term = search.to_string();
            snapshot.state = FetchState::Loading;
            sequence = snapshot.sequence;
        });
        debug!(sequence, search, "fetch started");
        sequence
    }

    async fn settle(self: Arc<Self>, sequence: u64, search: String) -> Publication {
        let outcome = AssertUnwindSafe(self.load(&search))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(FetchError::Unexpected(panic_message(payload.as_ref()))));
        self.publish(sequence, outcome)
    }

    async fn load(&self, search: &str) -> Result<Vec<CombinedRecord>, FetchError> {
        let users = self.fetch_users(search).await.map_err(FetchError::Users)?;
        let user_ids: Vec<u64> = users.iter().map(|user| user.id).collect();
        let posts = self.fetch_posts(&user_ids).await.map_err(FetchError::Posts)?;
        Ok(join(users, posts))
    }

    async fn fetch_users(&self, search: &str) -> Result<Vec<User>, ApiError> {
        let request = self.client.build_list_users(search);
        debug!(url = %request.url, "requesting users");
        let response = self.transport.execute(request).await?;
        self.client.parse_list_users(response)
    }

    async fn fetch_posts(&self, user_ids: &[u64]) -> Result<Vec<Post>, ApiError> {
        let Some(request) = self.client.build_list_posts(user_ids) else {
            debug!("no users matched, skipping posts request");
            return Ok(Vec::new());
        };
        debug!(url = %request.url, "requesting posts");
        let response = self.transport.execute(request).await?;
        self.client.parse_list_posts(response)
    }

    fn publish(&self, sequence: u64, outcome: Result<Vec<CombinedRecord>, FetchError>) -> Publication {
        let failure = outcome.as_ref().err().cloned();
        let next = match outcome {
            Ok(records) => FetchState::Success(records),
            Err(err) => FetchState::Error(err.to_string()),
        };

        let published = self.snapshot.send_if_modified(|snapshot| {
            if snapshot.sequence != sequence {
                return false;
            }
            snapshot.state = next;
            true
        });

        if !published {
            debug!(sequence, "discarding superseded fetch result");
            return Publication::Superseded;
        }
        match failure {
            Some(err) => warn!(sequence, error = %err, cause = ?err.source(), "fetch failed"),
            None => debug!(sequence, "fetch published"),
        }
        Publication::Published
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse};

    const BASE: &str = "http://api.test";

    #[derive(Clone)]
    enum Route {
        Respond(HttpResponse),
        Fail(ApiError),
        /// Wait for the gate, then respond.
        Gated(Arc<Notify>, HttpResponse),
        /// Never respond; flag is raised when the pending call is dropped.
        Hang(Arc<AtomicBool>),
        Panic,
    }

    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct ScriptedTransport {
        routes: HashMap<String, Route>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn route(mut self, path_and_query: &str, route: Route) -> Self {
            self.routes.insert(format!("{BASE}{path_and_query}"), route);
            self
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.lock().unwrap().push(request.url.clone());
            match self.routes.get(&request.url).cloned() {
                Some(Route::Respond(response)) => Ok(response),
                Some(Route::Fail(err)) => Err(err),
                Some(Route::Gated(gate, response)) => {
                    gate.notified().await;
                    Ok(response)
                }
                Some(Route::Hang(flag)) => {
                    let _guard = DropFlag(flag);
                    std::future::pending::<Result<HttpResponse, ApiError>>().await
                }
                Some(Route::Panic) => panic!("transport exploded"),
                None => Ok(HttpResponse {
                    status: 404,
                    headers: Vec::new(),
                    body: String::new(),
                }),
            }
        }
    }

    fn orchestrator(transport: ScriptedTransport) -> Orchestrator<Arc<ScriptedTransport>> {
        Orchestrator::new(ApiClient::new(BASE), Arc::new(transport))
    }

    fn json(body: &str) -> Route {
        Route::Respond(HttpResponse::ok(body))
    }

    const TEST_USER: &str = r#"[{
        "id": 1,
        "name": "Test User",
        "username": "testuser",
        "email": "testuser@example.com",
        "address": {
            "street": "Test Street",
            "suite": "Test Suite",
            "city": "Test City",
            "zipcode": "Test Zipcode",
            "geo": { "lat": "0", "lng": "0" }
        },
        "phone": "Test Phone",
        "website": "testwebsite.com",
        "company": {
            "name": "Test Company",
            "catchPhrase": "Test CatchPhrase",
            "bs": "Test BS"
        }
    }]"#;

    const TEST_POSTS: &str = r#"[
        {"id": 1, "userId": 1, "title": "Old", "body": "OldBody"},
        {"id": 2, "userId": 1, "title": "New", "body": "NewBody"}
    ]"#;

    #[tokio::test]
    async fn starts_idle() {
        let orch = orchestrator(ScriptedTransport::default());
        assert_eq!(orch.state(), FetchState::Idle);
        assert_eq!(orch.snapshot().sequence, 0);
    }

    #[tokio::test]
    async fn merges_users_with_latest_post() {
        let transport = ScriptedTransport::default()
            .route("/users?name_like=", json(TEST_USER))
            .route("/posts?userId=1", json(TEST_POSTS));
        let orch = orchestrator(transport);

        assert_eq!(orch.fetch("").await, Publication::Published);

        let state = orch.state();
        let records = state.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user.name, "Test User");
        assert_eq!(records[0].user.profile.company.bs, "Test BS");
        let post = records[0].post.as_ref().unwrap();
        assert_eq!((post.id, post.title.as_str(), post.body.as_str()), (2, "New", "NewBody"));
    }

    #[tokio::test]
    async fn malformed_users_body_skips_posts_request() {
        let transport = Arc::new(
            ScriptedTransport::default()
                .route("/users?name_like=x", json(r#"{"not":"an array"}"#))
                .route("/posts?userId=1", json(TEST_POSTS)),
        );
        let orch = Orchestrator::new(ApiClient::new(BASE), Arc::clone(&transport));

        orch.fetch("x").await;

        assert_eq!(
            orch.state(),
            FetchState::Error("Failed to fetch user data".to_string())
        );
        assert_eq!(transport.requests(), vec![format!("{BASE}/users?name_like=x")]);
    }

    #[tokio::test]
    async fn transport_failure_on_users_is_user_error() {
        let transport = ScriptedTransport::default().route(
            "/users?name_like=",
            Route::Fail(ApiError::Transport("connection refused".to_string())),
        );
        let orch = orchestrator(transport);
        orch.fetch("").await;
        assert_eq!(
            orch.state().error_message(),
            Some("Failed to fetch user data")
        );
    }

    #[tokio::test]
    async fn posts_failure_discards_previous_data() {
        let transport = ScriptedTransport::default()
            .route("/users?name_like=", json(TEST_USER))
            .route("/posts?userId=1", json(TEST_POSTS))
            .route("/users?name_like=Other", json(r#"[{"id":2,"name":"Other"}]"#))
            .route(
                "/posts?userId=2",
                Route::Respond(HttpResponse {
                    status: 500,
                    headers: Vec::new(),
                    body: "oops".to_string(),
                }),
            );
        let orch = orchestrator(transport);

        orch.fetch("").await;
        assert_eq!(orch.state().records().len(), 1);

        orch.fetch("Other").await;
        let state = orch.state();
        assert_eq!(state.error_message(), Some("Failed to fetch user posts data"));
        assert!(state.records().is_empty());
    }

    #[tokio::test]
    async fn recovers_after_error() {
        let transport = ScriptedTransport::default()
            .route("/users?name_like=bad", json("null"))
            .route("/users?name_like=", json(TEST_USER))
            .route("/posts?userId=1", json(TEST_POSTS));
        let orch = orchestrator(transport);

        orch.fetch("bad").await;
        assert!(orch.state().error_message().is_some());

        orch.fetch("").await;
        assert!(orch.state().error_message().is_none());
        assert_eq!(orch.state().records().len(), 1);
    }

    #[tokio::test]
    async fn no_matching_users_skips_posts_and_succeeds_empty() {
        let transport = Arc::new(
            ScriptedTransport::default().route("/users?name_like=zzz", json("[]")),
        );
        let orch = Orchestrator::new(ApiClient::new(BASE), Arc::clone(&transport));

        orch.fetch("zzz").await;

        assert_eq!(orch.state(), FetchState::Success(Vec::new()));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn panic_while_loading_becomes_error_state() {
        let transport = ScriptedTransport::default().route("/users?name_like=", Route::Panic);
        let orch = orchestrator(transport);

        assert_eq!(orch.fetch("").await, Publication::Published);
        assert_eq!(
            orch.state().error_message(),
            Some("Unexpected error while loading data")
        );
    }

    #[tokio::test]
    async fn slow_earlier_invocation_cannot_overwrite_newer_one() {
        let gate = Arc::new(Notify::new());
        let transport = ScriptedTransport::default()
            .route(
                "/users?name_like=foo",
                Route::Gated(Arc::clone(&gate), HttpResponse::ok("[]")),
            )
            .route("/users?name_like=bar", json(TEST_USER))
            .route("/posts?userId=1", json(TEST_POSTS));
        let orch = orchestrator(transport);

        let first = orch.fetch("foo");
        let second = async {
            let publication = orch.fetch("bar").await;
            gate.notify_one();
            publication
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, Publication::Superseded);
        assert_eq!(second, Publication::Published);
        let snapshot = orch.snapshot();
        assert_eq!(snapshot.sequence, 2);
        assert_eq!(snapshot.search_term, "bar");
        assert_eq!(snapshot.state.records().len(), 1);
    }

    #[tokio::test]
    async fn run_aborts_superseded_invocation() {
        let dropped = Arc::new(AtomicBool::new(false));
        let transport = Arc::new(
            ScriptedTransport::default()
                .route("/users?name_like=foo", Route::Hang(Arc::clone(&dropped)))
                .route("/users?name_like=bar", json(TEST_USER))
                .route("/posts?userId=1", json(TEST_POSTS)),
        );
        let mut orch = Orchestrator::new(ApiClient::new(BASE), Arc::clone(&transport));
        let mut updates = orch.subscribe();

        let first = orch.run("foo");
        while transport.requests().is_empty() {
            tokio::task::yield_now().await;
        }
        let second = orch.run("bar");
        assert_eq!((first, second), (1, 2));

        let settled = updates
            .wait_for(|s| s.sequence == second && s.state.is_settled())
            .await
            .unwrap()
            .clone();
        assert_eq!(settled.search_term, "bar");
        assert_eq!(settled.state.records()[0].post.as_ref().unwrap().id, 2);

        // Abort is delivered on the next poll of the aborted task.
        for _ in 0..10 {
            if dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn run_enters_loading_immediately() {
        let gate = Arc::new(Notify::new());
        let transport = ScriptedTransport::default().route(
            "/users?name_like=slow",
            Route::Gated(Arc::clone(&gate), HttpResponse::ok("[]")),
        );
        let mut orch = orchestrator(transport);

        orch.run("slow");
        assert!(orch.state().is_loading());
        assert_eq!(orch.search_term(), "slow");

        gate.notify_one();
        let mut updates = orch.subscribe();
        let state = updates
            .wait_for(|s| s.state.is_settled())
            .await
            .unwrap()
            .state
            .clone();
        assert_eq!(state, FetchState::Success(Vec::new()));
    }
}
