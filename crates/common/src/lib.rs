//! Yatube Common Library
//!
//! Models, persistence, pagination and shared utilities for the Yatube
//! blogging platform.

pub mod clock;
pub mod crypto;
pub mod db;
pub mod error;
pub mod models;
pub mod paginator;
pub mod posts;
pub mod types;
pub mod users;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use db::Database;
pub use error::{Error, Result};
pub use models::*;
pub use paginator::{Page, Paginator, DEFAULT_PAGE_SIZE};
pub use posts::PostFilter;
pub use types::FieldKind;

/// Yatube version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default data directory
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".yatube")
}

/// Default database path
pub fn default_db_path() -> std::path::PathBuf {
    default_data_dir().join("yatube.db")
}

/// Default upload directory
pub fn default_media_root() -> std::path::PathBuf {
    default_data_dir().join("media")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
