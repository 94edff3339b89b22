//! Session-loading middleware for Axum.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use tracing::{debug, warn};
use yatube_common::User;

use super::session::SESSION_COOKIE;
use crate::server::AppState;

/// Extension that holds the logged-in user
#[derive(Clone, Debug)]
pub struct AuthenticatedUser(pub User);

/// Attach the session's user to the request, if the cookie is valid
pub async fn load_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        match state.db.session_user(cookie.value()) {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => debug!("Ignoring unknown or expired session cookie"),
            Err(e) => warn!("Session lookup failed: {}", e),
        }
    }
    next.run(request).await
}

