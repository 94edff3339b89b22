//! Yatube Web
//!
//! Server-rendered blogging platform: feeds, groups, profiles, comments and
//! follows over the shared SQLite database.

pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod forms;
pub mod media;
pub mod server;
pub mod templates;
pub mod views;

pub use cache::PageCache;
pub use config::WebConfig;
pub use error::{WebError, WebResult};
pub use media::MediaStore;
pub use server::{AppState, WebServer};
pub use templates::{RenderedPage, Template, TemplateResponse};
