//! Yatube CLI
//!
//! Maintenance commands that work directly on the Yatube database:
//! page cache, groups, users and posts.

pub mod commands;
pub mod output;
