//! Web error type and its HTTP mapping

use crate::templates::{self, Template, TemplateResponse};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{json, Map};
use thiserror::Error;
use tracing::error;
use yatube_common::User;

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum WebError {
    #[error(transparent)]
    Common(#[from] yatube_common::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl WebError {
    pub fn not_found(what: impl Into<String>) -> Self {
        WebError::NotFound(what.into())
    }

    fn is_not_found(&self) -> bool {
        match self {
            WebError::NotFound(_) => true,
            WebError::Common(e) => e.is_not_found(),
            _ => false,
        }
    }
}

/// The 404 page
pub fn not_found_page(user: Option<&User>, what: &str) -> TemplateResponse {
    let mut context = Map::new();
    context.insert("message".to_string(), json!(what));
    TemplateResponse::new(Template::NotFound, context, templates::not_found(user, what))
        .with_status(StatusCode::NOT_FOUND)
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        if self.is_not_found() {
            let what = match &self {
                WebError::NotFound(what) => what.clone(),
                other => other.to_string(),
            };
            return not_found_page(None, &what).into_response();
        }

        match self {
            WebError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            other => {
                error!("Request failed: {}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
