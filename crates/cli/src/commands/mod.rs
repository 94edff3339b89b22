//! CLI Commands

pub mod cache;
pub mod group;
pub mod post;
pub mod status;
pub mod user;
