//! Cookie sessions and identity extractors
//!
//! [`middleware::load_session`] resolves the `sessionid` cookie once per
//! request and stores the user in the request extensions; handlers read it
//! back through [`CurrentUser`] or [`RequireUser`].

pub mod middleware;
pub mod session;

pub use middleware::{load_session, AuthenticatedUser};
pub use session::{
    login_url, removal_cookie, safe_next, session_cookie, CurrentUser, RequireUser,
    LOGIN_URL, SESSION_COOKIE,
};
