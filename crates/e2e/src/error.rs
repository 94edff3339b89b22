//! Error types for the expectation framework

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Invalid expectation: {0}")]
    InvalidExpectation(String),

    #[error("Request failed: {method} {url} - {reason}")]
    Request {
        method: String,
        url: String,
        reason: String,
    },

    #[error("Too many redirects starting at {0}")]
    RedirectLoop(String),

    #[error("Assertion failed:\n{0}")]
    AssertionFailed(String),

    #[error("Fixture error: {0}")]
    Fixture(#[from] yatube_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
