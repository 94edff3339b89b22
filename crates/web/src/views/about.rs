//! Static "about" pages

use serde_json::json;

use super::Context;
use crate::auth::CurrentUser;
use crate::templates::{self, Template, TemplateResponse};

pub async fn author(CurrentUser(user): CurrentUser) -> TemplateResponse {
    let context = Context::new().value("title", json!("About the author"));
    TemplateResponse::new(
        Template::AboutAuthor,
        context.into_map(),
        templates::about_author(user.as_ref()),
    )
}

pub async fn tech(CurrentUser(user): CurrentUser) -> TemplateResponse {
    let context = Context::new().value("title", json!("Technologies"));
    TemplateResponse::new(
        Template::AboutTech,
        context.into_map(),
        templates::about_tech(user.as_ref()),
    )
}
