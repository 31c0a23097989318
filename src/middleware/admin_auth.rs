use axum::{extract::Request, middleware::Next, response::Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::Session;

/// Configured admin login. Only digests are kept so comparisons run in
/// constant time regardless of input length.
#[derive(Clone)]
pub struct AdminCredentials {
    username: String,
    username_digest: [u8; 32],
    /// None disables admin login entirely
    password_digest: Option<[u8; 32]>,
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl AdminCredentials {
    pub fn new(username: &str, password: Option<&str>) -> Self {
        Self {
            username: username.to_string(),
            username_digest: digest(username),
            password_digest: password.filter(|p| !p.is_empty()).map(digest),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_enabled(&self) -> bool {
        self.password_digest.is_some()
    }

    pub fn verify(&self, username: &str, password: &str) -> bool {
        let Some(expected_password) = &self.password_digest else {
            return false;
        };
        let user_ok = self.username_digest[..].ct_eq(&digest(username)[..]);
        let pass_ok = expected_password[..].ct_eq(&digest(password)[..]);
        bool::from(user_ok & pass_ok)
    }
}

/// Reject requests whose session is not logged in as admin.
/// Must run inside `load_session`.
pub async fn require_admin(request: Request, next: Next) -> Result<Response> {
    let is_admin = request
        .extensions()
        .get::<Session>()
        .is_some_and(Session::is_admin);
    if !is_admin {
        return Err(AppError::Unauthorized("Admin login required".into()));
    }
    Ok(next.run(request).await)
}
