//! Signup, login and logout

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use yatube_common::{Error as CommonError, User};

use super::{redirect, Context};
use crate::auth::{removal_cookie, safe_next, session_cookie, CurrentUser, SESSION_COOKIE};
use crate::error::WebResult;
use crate::forms::{Form, FormSubmission, LoginForm, SignupForm, NON_FIELD_ERRORS};
use crate::server::AppState;
use crate::templates::{self, Template, TemplateResponse};

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Issue a session for `user` and redirect to `target`
fn start_session(state: &AppState, jar: CookieJar, user: &User, target: &str) -> WebResult<Response> {
    let token = state
        .db
        .create_session(user.id, state.config.session_ttl())?;
    let jar = jar.add(session_cookie(token, &state.config.session));
    info!("User {} logged in", user.username);
    Ok((jar, redirect(target)).into_response())
}

// ============================================================================
// Signup
// ============================================================================

fn render_signup(user: Option<&User>, form: Form) -> TemplateResponse {
    let html = templates::signup(user, &form);
    let context = Context::new().value("form", form.to_context());
    TemplateResponse::new(Template::Signup, context.into_map(), html)
}

pub async fn signup_page(CurrentUser(user): CurrentUser) -> TemplateResponse {
    render_signup(user.as_ref(), SignupForm::empty())
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
    submission: FormSubmission,
) -> WebResult<Response> {
    let (new_user, mut form) = match SignupForm::validate(&submission) {
        Ok(valid) => valid,
        Err(form) => return Ok(render_signup(user.as_ref(), form).into_response()),
    };

    if state.db.get_user_by_username(&new_user.username)?.is_some() {
        form.add_error("username", USERNAME_TAKEN);
        return Ok(render_signup(user.as_ref(), form).into_response());
    }

    let created = match state.db.create_user(&new_user) {
        Ok(created) => created,
        Err(CommonError::AlreadyExists { .. }) => {
            form.add_error("username", USERNAME_TAKEN);
            return Ok(render_signup(user.as_ref(), form).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    start_session(&state, jar, &created, "/")
}

// ============================================================================
// Login / logout
// ============================================================================

fn render_login(user: Option<&User>, form: Form, next: Option<&str>) -> TemplateResponse {
    let html = templates::login(user, &form, next);
    let context = Context::new()
        .value("form", form.to_context())
        .value("next", json!(next));
    TemplateResponse::new(Template::Login, context.into_map(), html)
}

pub async fn login_page(
    CurrentUser(user): CurrentUser,
    Query(query): Query<NextQuery>,
) -> TemplateResponse {
    render_login(user.as_ref(), LoginForm::empty(), query.next.as_deref())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    submission: FormSubmission,
) -> WebResult<Response> {
    let next = query.next.as_deref();
    let (username, password, mut form) = match LoginForm::validate(&submission) {
        Ok(valid) => valid,
        Err(form) => return Ok(render_login(user.as_ref(), form, next).into_response()),
    };

    match state.db.authenticate(&username, &password)? {
        Some(account) => start_session(&state, jar, &account, safe_next(next).unwrap_or("/")),
        None => {
            form.add_error(NON_FIELD_ERRORS, BAD_CREDENTIALS);
            Ok(render_login(user.as_ref(), form, next).into_response())
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> WebResult<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.db.delete_session(cookie.value())?;
    }
    let jar = jar.remove(removal_cookie());

    let page = TemplateResponse::new(
        Template::LoggedOut,
        Context::new().into_map(),
        templates::logged_out(),
    );
    Ok((jar, page).into_response())
}
