// Keep provider request/response plain Rust structs to avoid serde
// requirements on the session table.
use crate::error::AppResult;
use crate::security;
use crate::storage::SharedStore;
use crate::tprintln;

use super::principal::Principal;
use super::session::{SessionManager, SessionToken};

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub token: SessionToken,
    pub principal: Principal,
}

/// Capability interface for the authenticator: verify credentials and manage
/// the session bound to them. Deliberately independent of the user data
/// model — it depends on the credential store, it is not fused into it.
pub trait AuthProvider: Send + Sync {
    fn login(&self, store: &SharedStore, req: &LoginRequest) -> AppResult<LoginResponse>;
    /// Invalidate a session token. Idempotent: unknown tokens are a no-op.
    fn logout(&self, token: &str);
}

pub struct LocalAuthProvider {
    sessions: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, store: &SharedStore, req: &LoginRequest) -> AppResult<LoginResponse> {
        let user = security::verify_credentials(store, &req.username, &req.password)?;
        let token = self.sessions.create(&user.id);
        tprintln!("auth.login user={}", user.username);
        Ok(LoginResponse {
            token,
            principal: Principal {
                user_id: user.id,
                username: user.username,
                name: user.name,
            },
        })
    }

    fn logout(&self, token: &str) {
        self.sessions.destroy(token);
    }
}
