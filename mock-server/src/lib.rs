//! In-memory stand-in for the users/posts API.
//!
//! Serves the two read endpoints with the same query shape as the public
//! API: `/users?name_like=` (case-insensitive substring on `name`) and
//! `/posts?userId=..&userId=..`. Data is read-only and shared behind an `Arc`.

use std::sync::Arc;

use axum::{
    extract::{Query, RawQuery, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::net::TcpListener;
use tracing::debug;
use url::form_urlencoded;

const USERS_FIXTURE: &str = include_str!("../fixtures/users.json");
const POSTS_FIXTURE: &str = include_str!("../fixtures/posts.json");

/// A user as stored by the server. Only `id` and `name` are interpreted;
/// every other field is echoed back verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    #[serde(flatten)]
    pub profile: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
    pub body: String,
}

#[derive(Clone, Debug, Default)]
pub struct Dataset {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
}

impl Dataset {
    /// The bundled sample data.
    pub fn fixtures() -> Result<Self, serde_json::Error> {
        Ok(Self {
            users: serde_json::from_str(USERS_FIXTURE)?,
            posts: serde_json::from_str(POSTS_FIXTURE)?,
        })
    }
}

pub type Db = Arc<Dataset>;

#[derive(Deserialize)]
pub struct UserQuery {
    pub name_like: Option<String>,
}

pub fn app() -> Result<Router, serde_json::Error> {
    Ok(app_with(Dataset::fixtures()?))
}

pub fn app_with(dataset: Dataset) -> Router {
    let db: Db = Arc::new(dataset);
    Router::new()
        .route("/users", get(list_users))
        .route("/posts", get(list_posts))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    let app = app().map_err(std::io::Error::other)?;
    axum::serve(listener, app).await
}

async fn list_users(State(db): State<Db>, Query(query): Query<UserQuery>) -> Json<Vec<User>> {
    let needle = query.name_like.unwrap_or_default().to_lowercase();
    let users: Vec<User> = db
        .users
        .iter()
        .filter(|user| user.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    debug!(name_like = %needle, matched = users.len(), "list users");
    Json(users)
}

async fn list_posts(
    State(db): State<Db>,
    RawQuery(query): RawQuery,
) -> Result<Json<Vec<Post>>, StatusCode> {
    let user_ids = parse_user_ids(query.as_deref().unwrap_or_default())?;
    let posts: Vec<Post> = db
        .posts
        .iter()
        .filter(|post| user_ids.is_empty() || user_ids.contains(&post.user_id))
        .cloned()
        .collect();
    debug!(?user_ids, matched = posts.len(), "list posts");
    Ok(Json(posts))
}

/// Every `userId` value in the query; other parameters are ignored.
fn parse_user_ids(query: &str) -> Result<Vec<u64>, StatusCode> {
    form_urlencoded::parse(query.as_bytes())
        .filter(|(name, _)| name == "userId")
        .map(|(_, value)| value.parse().map_err(|_| StatusCode::BAD_REQUEST))
        .collect()
}
