use axum::{
    extract::{Request, State},
    http::{HeaderValue, header::SET_COOKIE},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::db::{AppState, queries};
use crate::error::Result;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Sessions idle for longer than this are treated as expired
    pub ttl_days: i64,
    pub cookie_secure: bool,
}

pub fn session_cookie(id: String, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .build()
}

/// Resolve the `sid` cookie to a server-side session, creating one when the
/// cookie is missing, unknown or expired. The session is inserted into the
/// request extensions.
pub async fn load_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let jar = CookieJar::from_headers(request.headers());
    let cookie_id = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());

    let (session, created) = {
        let conn = state.db.get()?;
        let existing = match cookie_id {
            Some(id) => queries::get_active_session(&conn, &id, state.sessions.ttl_days)?,
            None => None,
        };
        match existing {
            Some(session) => (session, false),
            None => (queries::create_session(&conn)?, true),
        }
    };

    let session_id = session.id.clone();
    request.extensions_mut().insert(session);
    let mut response = next.run(request).await;

    // Handlers that rotate the session set their own cookie
    if created && !sets_session_cookie(&response) {
        let cookie = session_cookie(session_id, state.sessions.cookie_secure);
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode session cookie"),
        }
    }

    Ok(response)
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{}=", SESSION_COOKIE);
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|v| v.to_str().is_ok_and(|s| s.starts_with(&prefix)))
}
