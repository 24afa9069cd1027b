use serde::{Deserialize, Serialize};

/// The resolved actor behind an authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub username: String,
    /// Display name, denormalized onto posts at compose time.
    pub name: String,
}
