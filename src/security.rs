//! Credential store: user identity records and password verification.
//!
//! Passwords are stored only as Argon2id PHC strings; plaintext never touches
//! disk and hashes are never logged or rendered. Registration enforces two
//! independent uniqueness checks (login handle and display name) before any
//! hash is derived, so a rejected attempt leaves no partial write behind.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::storage::{SharedStore, USERS};
use crate::tprintln;

/// Persisted user identity document.
///
/// `posts` is a denormalized index of owned post ids: posts are independently
/// addressable in the posts collection, this list only answers "which posts
/// does this user own" without a full scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Unique login handle the user authenticates with.
    pub username: String,
    /// Display name shown on posts; also unique across users.
    pub name: String,
    /// Argon2id PHC string. Never logged, never rendered.
    pub password_hash: String,
    /// Ids of posts owned by this user, in creation order.
    pub posts: Vec<String>,
}

pub(crate) fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub(crate) fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Register a new user.
///
/// Handle uniqueness compares the `username` field (case-insensitive, the
/// handle is what gets typed at login) and display-name uniqueness compares
/// the `name` field exactly. Both checks run before the password hash is
/// computed; the conflict error never says which field collided.
pub fn register_user(store: &SharedStore, username: &str, name: &str, password: &str) -> AppResult<User> {
    let username = username.trim();
    let name = name.trim();
    if username.is_empty() || name.is_empty() || password.is_empty() {
        return Err(AppError::user("missing_fields", "username, name and password are required"));
    }
    {
        let guard = store.0.lock();
        let existing: Vec<User> = guard.list(USERS).map_err(AppError::from)?;
        let collides = existing.iter().any(|u| u.username.eq_ignore_ascii_case(username))
            || existing.iter().any(|u| u.name == name);
        if collides {
            return Err(AppError::conflict("account_exists", "an account with these details already exists"));
        }
    }
    // Hashing runs outside the store lock; the duplicate race between two
    // concurrent signups is left to the store's own best-effort handling.
    let password_hash = hash_password(password).map_err(AppError::from)?;
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        name: name.to_string(),
        password_hash,
        posts: Vec::new(),
    };
    store.0.lock().put(USERS, &user.id, &user).map_err(AppError::from)?;
    tprintln!("security.register user={} id={}", user.username, user.id);
    Ok(user)
}

/// Verify login credentials.
///
/// Unknown handle and wrong password produce the same `auth` error, so the
/// response does not reveal whether the handle exists.
pub fn verify_credentials(store: &SharedStore, username: &str, password: &str) -> AppResult<User> {
    let found = {
        let guard = store.0.lock();
        let existing: Vec<User> = guard.list(USERS).map_err(AppError::from)?;
        existing.into_iter().find(|u| u.username.eq_ignore_ascii_case(username.trim()))
    };
    // Hash verification runs outside the store lock
    match found {
        Some(user) if verify_password(&user.password_hash, password) => Ok(user),
        _ => Err(AppError::auth("invalid_credentials", "invalid username or password")),
    }
}

/// Look a user up by id.
pub fn find_user_by_id(store: &SharedStore, id: &str) -> AppResult<User> {
    let guard = store.0.lock();
    let found: Option<User> = guard.get(USERS, id).map_err(AppError::from)?;
    found.ok_or_else(|| AppError::not_found("user_not_found", "no such user"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn mk_store() -> (tempfile::TempDir, SharedStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SharedStore::new(tmp.path()).unwrap();
        (tmp, store)
    }

    #[test]
    fn register_then_verify_roundtrip() {
        let (_tmp, store) = mk_store();
        let user = register_user(&store, "alice", "Alice", "p@ss").unwrap();
        assert!(user.posts.is_empty());
        assert_ne!(user.password_hash, "p@ss");
        let back = verify_credentials(&store, "alice", "p@ss").unwrap();
        assert_eq!(back.id, user.id);
    }

    #[test]
    fn duplicate_handle_rejected_once_persisted() {
        let (_tmp, store) = mk_store();
        register_user(&store, "alice", "Alice", "pw1").unwrap();
        let err = register_user(&store, "Alice", "Someone Else", "pw2").unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
        // Only one user persists
        let all: Vec<User> = store.0.lock().list(USERS).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn duplicate_display_name_rejected() {
        let (_tmp, store) = mk_store();
        register_user(&store, "alice", "Alice", "pw1").unwrap();
        let err = register_user(&store, "alice2", "Alice", "pw2").unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[test]
    fn conflict_message_does_not_name_the_field() {
        let (_tmp, store) = mk_store();
        register_user(&store, "alice", "Alice", "pw1").unwrap();
        let by_handle = register_user(&store, "alice", "Other", "pw").unwrap_err();
        let by_name = register_user(&store, "other", "Alice", "pw").unwrap_err();
        assert_eq!(by_handle.message(), by_name.message());
        assert!(!by_handle.message().contains("username"));
        assert!(!by_handle.message().contains("name"));
    }

    #[test]
    fn wrong_password_is_auth_failure() {
        let (_tmp, store) = mk_store();
        register_user(&store, "alice", "Alice", "right").unwrap();
        let err = verify_credentials(&store, "alice", "wrong").unwrap_err();
        assert!(matches!(err, AppError::Auth { .. }));
        // Unknown handle looks identical
        let err2 = verify_credentials(&store, "nobody", "whatever").unwrap_err();
        assert_eq!(err.message(), err2.message());
    }

    #[test]
    fn concurrent_distinct_registrations_all_persist() {
        let (_tmp, store) = mk_store();
        let mut handles = Vec::new();
        for i in 0..4 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                register_user(&store, &format!("user{}", i), &format!("User {}", i), "pw").unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let all: Vec<User> = store.0.lock().list(USERS).unwrap();
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn find_user_by_id_missing_is_not_found() {
        let (_tmp, store) = mk_store();
        let err = find_user_by_id(&store, "4be1c1a2-0c63-4f3b-9a57-1c2d3e4f5a6b").unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[test]
    fn phc_hash_verifies_and_rejects() {
        let phc = hash_password("secret").unwrap();
        assert!(phc.starts_with("$argon2"));
        assert!(verify_password(&phc, "secret"));
        assert!(!verify_password(&phc, "Secret"));
        assert!(!verify_password("not-a-phc-string", "secret"));
    }
}
