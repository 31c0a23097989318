use serde::{Deserialize, Serialize};

/// Server-side browser session, identified by the `sid` cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Set after a successful admin login
    pub admin_user: Option<String>,
    pub created_at: i64,
    pub last_seen_at: i64,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.admin_user.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}
