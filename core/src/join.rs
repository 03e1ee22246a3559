//! Pairs each user with their representative post.
//!
//! Posts are grouped by `user_id` in one pass, keeping the highest `id`
//! per author, so the join is linear in `users + posts`. When two posts of
//! the same author share an `id` the first one seen is kept.

use std::collections::HashMap;

use crate::types::{CombinedRecord, Post, User};

/// The highest-`id` post of every author present in `posts`.
pub fn representative_posts(posts: Vec<Post>) -> HashMap<u64, Post> {
    let mut best: HashMap<u64, Post> = HashMap::new();
    for post in posts {
        match best.get(&post.user_id) {
            Some(current) if current.id >= post.id => {}
            _ => {
                best.insert(post.user_id, post);
            }
        }
    }
    best
}

/// One record per user, in `users` order.
///
/// Posts whose author is not among `users` are dropped.
pub fn join(users: Vec<User>, posts: Vec<Post>) -> Vec<CombinedRecord> {
    let best = representative_posts(posts);
    users
        .into_iter()
        .map(|user| {
            let post = best.get(&user.id).cloned();
            CombinedRecord { user, post }
        })
        .collect()
}
