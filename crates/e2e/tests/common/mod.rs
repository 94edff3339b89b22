//! Shared fixtures for the integration tests

#![allow(dead_code)]

use yatube_common::{Group, PostView, User};
use yatube_e2e::{E2eResult, TestApp};

/// A 2x1 GIF
pub const SMALL_GIF: &[u8] = &[
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x02, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00,
    0x00, 0xFF, 0xFF, 0xFF, 0x21, 0xF9, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
    0x00, 0x00, 0x02, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x0C, 0x0A, 0x00, 0x3B,
];

/// An author with one grouped post, plus a second user who owns nothing
pub struct Blog {
    pub app: TestApp,
    pub author: User,
    pub reader: User,
    pub group: Group,
    pub post: PostView,
}

impl Blog {
    pub fn new() -> E2eResult<Self> {
        let app = TestApp::new()?;
        let author = app.create_user("author")?;
        let reader = app.create_user("reader")?;
        let group = app.create_group("Group title", "group-slug", "Group description")?;
        let post = app.create_post(&author, &"A".repeat(30), Some(&group))?;
        Ok(Self {
            app,
            author,
            reader,
            group,
            post,
        })
    }

    pub fn post_url(&self, suffix: &str) -> String {
        format!("/posts/{}/{}", self.post.post.id, suffix)
    }
}
