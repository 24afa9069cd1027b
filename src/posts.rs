//! Post repository: CRUD over post documents, each owned by exactly one user.
//!
//! The owner is fixed at creation from the authenticated actor and never
//! changes. The short preview is computed once at creation, not on read, so
//! feed listings never re-derive it. Deletion removes both the post document
//! and the owner's index entry; a failure between the two is reported rather
//! than leaving a silent orphan.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::Principal;
use crate::security::User;
use crate::storage::{SharedStore, POSTS, USERS};
use crate::tprintln;

/// Preview budget in characters, including the ellipsis marker.
const PREVIEW_CHARS: usize = 100;
const ELLIPSIS: &str = "...";

/// Persisted post document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Word-safe truncation of `content`, at most 100 characters.
    pub content_short: String,
    /// Human-readable compose time, e.g. "2026-08-26 14:03".
    pub date: String,
    /// Epoch milliseconds of the compose time; feed ordering key.
    pub created_at_ms: i64,
    /// Id of the owning user. Immutable after creation.
    pub owner_id: String,
    /// Display name of the owner at compose time (denormalized copy).
    pub author: String,
}

/// Derive the feed preview for a post body: the full content when it fits in
/// the budget, otherwise a prefix cut back to a word boundary plus `...`.
pub fn truncate_preview(content: &str) -> String {
    let total = content.chars().count();
    if total <= PREVIEW_CHARS {
        return content.to_string();
    }
    let budget = PREVIEW_CHARS - ELLIPSIS.chars().count();
    // Byte offset after `budget` characters
    let mut end = content.len();
    for (count, (idx, _)) in content.char_indices().enumerate() {
        if count == budget {
            end = idx;
            break;
        }
    }
    let mut head = &content[..end];
    // If the cut lands mid-word, back off to the last whitespace in the head.
    let cut_mid_word = content[end..].chars().next().is_some_and(|c| !c.is_whitespace());
    if cut_mid_word {
        if let Some(ws) = head.rfind(char::is_whitespace) {
            head = &head[..ws];
        }
    }
    format!("{}{}", head.trim_end(), ELLIPSIS)
}

/// Create a post owned by `owner`, appending its id to the owner's index.
pub fn create_post(
    store: &SharedStore,
    owner: &Principal,
    title: &str,
    content: &str,
    now: DateTime<Utc>,
) -> AppResult<Post> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::user("missing_title", "a post needs a title"));
    }
    let post = Post {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        content: content.to_string(),
        content_short: truncate_preview(content),
        date: now.format("%Y-%m-%d %H:%M").to_string(),
        created_at_ms: now.timestamp_millis(),
        owner_id: owner.user_id.clone(),
        author: owner.name.clone(),
    };
    let guard = store.0.lock();
    guard.put(POSTS, &post.id, &post).map_err(AppError::from)?;
    let mut user: User = guard
        .get(USERS, &owner.user_id)
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::not_found("user_not_found", "post owner no longer exists"))?;
    user.posts.push(post.id.clone());
    guard.put(USERS, &user.id, &user).map_err(AppError::from)?;
    tprintln!("posts.create id={} owner={}", post.id, post.owner_id);
    Ok(post)
}

fn sort_feed(posts: &mut [Post]) {
    // Stable feed order: compose time, then id as tie-break
    posts.sort_by(|a, b| {
        a.created_at_ms
            .cmp(&b.created_at_ms)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// All posts, in stable feed order.
pub fn list_all(store: &SharedStore) -> AppResult<Vec<Post>> {
    let mut posts: Vec<Post> = store.0.lock().list(POSTS).map_err(AppError::from)?;
    sort_feed(&mut posts);
    Ok(posts)
}

/// Posts owned by one user, in stable feed order.
pub fn list_by_owner(store: &SharedStore, owner_id: &str) -> AppResult<Vec<Post>> {
    let mut posts: Vec<Post> = store.0.lock().list(POSTS).map_err(AppError::from)?;
    posts.retain(|p| p.owner_id == owner_id);
    sort_feed(&mut posts);
    Ok(posts)
}

pub fn find_by_id(store: &SharedStore, id: &str) -> AppResult<Post> {
    let found: Option<Post> = store.0.lock().get(POSTS, id).map_err(AppError::from)?;
    found.ok_or_else(|| AppError::not_found("post_not_found", "no such post"))
}

/// Delete a post if `acting_user_id` owns it.
///
/// Removes the document from the posts collection and pulls the id from the
/// owner's index. If the index update fails after the document is gone, the
/// orphaned entry is reported as an `io` error instead of being swallowed.
pub fn delete_post(store: &SharedStore, id: &str, acting_user_id: &str) -> AppResult<()> {
    let guard = store.0.lock();
    let found: Option<Post> = guard.get(POSTS, id).map_err(AppError::from)?;
    let post = found.ok_or_else(|| AppError::not_found("post_not_found", "no such post"))?;
    if post.owner_id != acting_user_id {
        return Err(AppError::forbidden("not_owner", "only the owner may delete a post"));
    }
    guard.delete(POSTS, id).map_err(AppError::from)?;
    let index_result = (|| -> anyhow::Result<()> {
        if let Some(mut user) = guard.get::<User>(USERS, &post.owner_id)? {
            user.posts.retain(|p| p != id);
            guard.put(USERS, &user.id, &user)?;
        }
        Ok(())
    })();
    if let Err(e) = index_result {
        return Err(AppError::io(
            "index_orphaned".to_string(),
            format!("post {} removed but owner index update failed: {}", id, e),
        ));
    }
    tprintln!("posts.delete id={} owner={}", id, acting_user_id);
    Ok(())
}
