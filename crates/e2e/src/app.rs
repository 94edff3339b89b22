//! Test application fixture
//!
//! An in-memory database on a [`ManualClock`], a throwaway media root, and
//! the real router on top. Clients log in by minting a session directly.

use axum::Router;
use chrono::Duration;
use std::path::Path;
use std::sync::{Arc, Once};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;
use yatube_common::{
    Database, Group, ManualClock, NewGroup, NewUser, PostDraft, PostView, SharedClock, User,
};
use yatube_web::{AppState, WebConfig, WebServer};

use crate::client::TestClient;
use crate::error::E2eResult;
use crate::runner::SuiteRunner;

/// Password given to every fixture user
pub const TEST_PASSWORD: &str = "correct-horse-42";

/// Install a test log subscriber once; honours `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub struct TestApp {
    pub db: Database,
    pub clock: Arc<ManualClock>,
    server: WebServer,
    media: TempDir,
}

impl TestApp {
    pub fn new() -> E2eResult<Self> {
        Self::with_config(WebConfig::default())
    }

    /// Build around `config`; the database and media root are always
    /// replaced with throwaway ones
    pub fn with_config(mut config: WebConfig) -> E2eResult<Self> {
        init_tracing();

        let media = tempfile::tempdir()?;
        config.media_root = media.path().to_path_buf();

        let clock = Arc::new(ManualClock::starting_now());
        let shared: SharedClock = clock.clone();
        let db = Database::open_memory()?.with_clock(shared);
        let server = WebServer::with_database(config, db.clone());

        Ok(Self {
            db,
            clock,
            server,
            media,
        })
    }

    pub fn router(&self) -> Router {
        self.server.router()
    }

    pub fn state(&self) -> Arc<AppState> {
        self.server.state()
    }

    pub fn media_root(&self) -> &Path {
        self.media.path()
    }

    /// Move the fixture clock forward
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Anonymous client
    pub fn guest(&self) -> TestClient {
        TestClient::new(self.router())
    }

    /// Client logged in as `user`
    pub fn client(&self, user: &User) -> E2eResult<TestClient> {
        let ttl = self.state().config.session_ttl();
        let token = self.db.create_session(user.id, ttl)?;
        Ok(TestClient::with_session(self.router(), token))
    }

    /// Runner with a guest, `authorized` as the non-owner and `author` as
    /// the owner
    pub fn runner(&self, authorized: &User, author: &User) -> E2eResult<SuiteRunner> {
        Ok(SuiteRunner::new(
            self.guest(),
            self.client(authorized)?,
            self.client(author)?,
        ))
    }

    pub fn create_user(&self, username: &str) -> E2eResult<User> {
        Ok(self.db.create_user(&NewUser {
            username: username.to_string(),
            password: TEST_PASSWORD.to_string(),
            ..Default::default()
        })?)
    }

    pub fn create_group(&self, title: &str, slug: &str, description: &str) -> E2eResult<Group> {
        Ok(self.db.create_group(&NewGroup {
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        })?)
    }

    pub fn create_post(
        &self,
        author: &User,
        text: &str,
        group: Option<&Group>,
    ) -> E2eResult<PostView> {
        Ok(self.db.create_post(
            author.id,
            &PostDraft {
                text: text.to_string(),
                group_id: group.map(|g| g.id),
                image: None,
            },
        )?)
    }
}
