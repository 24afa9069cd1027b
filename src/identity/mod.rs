//! Central identity and session management for quill.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod session;

pub use principal::Principal;
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse};
pub use session::{SessionManager, SessionToken};
