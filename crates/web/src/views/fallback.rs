//! Unknown routes

use axum::http::Uri;

use crate::auth::CurrentUser;
use crate::error::not_found_page;
use crate::templates::TemplateResponse;

pub async fn not_found_handler(CurrentUser(user): CurrentUser, uri: Uri) -> TemplateResponse {
    not_found_page(user.as_ref(), uri.path())
}
