use axum::extract::{Extension, State};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::db::{AppState, queries};
use crate::error::{AppError, Result};
use crate::extractors::Json;
use crate::middleware::session_cookie;
use crate::models::{AdminLogin, Session};

#[derive(Debug, Serialize)]
pub struct AdminMe {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Log in as admin. The session id is rotated so a pre-login id cannot be
/// reused; the cart moves with it.
pub async fn login(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(input): Json<AdminLogin>,
) -> Result<(CookieJar, Json<AdminMe>)> {
    if !state.admin.verify(&input.username, &input.password) {
        tracing::warn!(username = %input.username, "Failed admin login");
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let conn = state.db.get()?;
    let rotated = queries::rotate_session(&conn, &session.id, Some(state.admin.username()))?;
    tracing::info!(username = %state.admin.username(), "Admin logged in");

    let jar = CookieJar::new().add(session_cookie(rotated.id, state.sessions.cookie_secure));
    Ok((
        jar,
        Json(AdminMe {
            username: state.admin.username().to_string(),
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Json<MessageResponse>> {
    let conn = state.db.get()?;
    queries::set_session_admin(&conn, &session.id, None)?;
    Ok(Json(MessageResponse {
        message: "Logged out",
    }))
}

pub async fn me(Extension(session): Extension<Session>) -> Result<Json<AdminMe>> {
    let username = session
        .admin_user
        .ok_or_else(|| AppError::Unauthorized("Not logged in".into()))?;
    Ok(Json(AdminMe { username }))
}
