use base64::Engine;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::tprintln;

pub type SessionToken = String;

fn gen_token() -> String {
    // 256-bit random token, base64url without padding. A token must never be
    // minted from anything but the OS RNG, so an RNG failure is fatal here.
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).expect("operating system RNG unavailable");
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

/// Server-side session table: opaque token -> user id.
///
/// A session is in exactly one of two states, absent or active; `create`
/// moves absent -> active and `destroy` moves active -> absent. There is no
/// pending state and no expiry enforced here: stale bindings are simply
/// destroyed on sign-out or dropped with the process.
///
/// Cloning a `SessionManager` shares the underlying table, so every request
/// handler sees the same bindings. Reads and writes from concurrent requests
/// go through the `RwLock`; bindings never tear.
#[derive(Clone, Default)]
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<SessionToken, String>>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint an unpredictable token bound to `user_id` and return it for the
    /// caller to place in a client-held cookie.
    pub fn create(&self, user_id: &str) -> SessionToken {
        let token = gen_token();
        self.sessions.write().insert(token.clone(), user_id.to_string());
        tprintln!("session.create user={}", user_id);
        token
    }

    /// Resolve a token to its user id. Absent or malformed tokens yield
    /// `None` — callers treat that as "anonymous", never as a fault.
    pub fn resolve(&self, token: &str) -> Option<String> {
        self.sessions.read().get(token).cloned()
    }

    /// Remove a binding. Destroying an unknown token is not an error.
    pub fn destroy(&self, token: &str) {
        let removed = self.sessions.write().remove(token);
        if removed.is_some() {
            tprintln!("session.destroy");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_resolve_destroy_roundtrip() {
        let sm = SessionManager::new();
        let token = sm.create("user-1");
        assert_eq!(sm.resolve(&token), Some("user-1".to_string()));
        sm.destroy(&token);
        assert_eq!(sm.resolve(&token), None);
        // idempotent
        sm.destroy(&token);
        assert_eq!(sm.resolve(&token), None);
    }

    #[test]
    fn unknown_and_malformed_tokens_resolve_to_none() {
        let sm = SessionManager::new();
        assert_eq!(sm.resolve(""), None);
        assert_eq!(sm.resolve("not a token"), None);
        assert_eq!(sm.resolve(&gen_token()), None);
    }

    #[test]
    fn tokens_are_unpredictable_enough_to_differ() {
        let a = gen_token();
        let b = gen_token();
        assert_ne!(a, b);
        assert!(a.len() >= 40);
    }

    #[test]
    fn minted_tokens_are_unique_and_never_the_zero_token() {
        let sm = SessionManager::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            assert!(seen.insert(sm.create("user-1")), "token repeated");
        }
        let zero = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([0u8; 32]);
        assert!(!seen.contains(&zero));
    }

    #[test]
    fn concurrent_sessions_never_cross_resolve() {
        let sm = SessionManager::new();
        let mut handles = Vec::new();
        for i in 0..16 {
            let sm = sm.clone();
            handles.push(std::thread::spawn(move || {
                let uid = format!("user-{}", i);
                let token = sm.create(&uid);
                for _ in 0..200 {
                    assert_eq!(sm.resolve(&token), Some(uid.clone()));
                }
                sm.destroy(&token);
                assert_eq!(sm.resolve(&token), None);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
    }
}
