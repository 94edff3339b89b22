//! Web server: shared state, router and listener

use axum::{
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;
use yatube_common::Database;

use crate::cache::PageCache;
use crate::config::WebConfig;
use crate::media::MediaStore;
use crate::views::{about, fallback, posts, users};

/// Web server state
pub struct AppState {
    pub db: Database,
    pub cache: PageCache,
    pub media: MediaStore,
    pub config: WebConfig,
}

/// Web server
#[derive(Clone)]
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Open the configured database and build the server
    pub fn new(config: WebConfig) -> anyhow::Result<Self> {
        let db = Database::open(&config.db_path)?;
        Ok(Self::with_database(config, db))
    }

    /// Build the server around an already opened database
    pub fn with_database(config: WebConfig, db: Database) -> Self {
        let cache = PageCache::new(db.clone(), config.cache_timeout());
        let media = MediaStore::new(config.media_root.clone());
        Self {
            state: Arc::new(AppState {
                db,
                cache,
                media,
                config,
            }),
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Create router
    pub fn router(&self) -> Router {
        let session_layer =
            middleware::from_fn_with_state(self.state.clone(), crate::auth::load_session);

        Router::new()
            // Posts
            .route("/", get(posts::index))
            .route("/group/:slug/", get(posts::group_list))
            .route("/profile/:username/", get(posts::profile))
            .route("/posts/:post_id/", get(posts::post_detail))
            .route("/create/", get(posts::post_create_page).post(posts::post_create))
            .route(
                "/posts/:post_id/edit/",
                get(posts::post_edit_page).post(posts::post_edit),
            )
            .route(
                "/posts/:post_id/comment/",
                get(posts::add_comment_page).post(posts::add_comment),
            )
            .route("/follow/", get(posts::follow_index))
            .route("/profile/:username/follow/", get(posts::profile_follow))
            .route("/profile/:username/unfollow/", get(posts::profile_unfollow))
            // About
            .route("/about/author/", get(about::author))
            .route("/about/tech/", get(about::tech))
            // Users
            .route("/auth/signup/", get(users::signup_page).post(users::signup))
            .route("/auth/login/", get(users::login_page).post(users::login))
            .route("/auth/logout/", get(users::logout).post(users::logout))
            // Uploaded media
            .nest_service("/media", ServeDir::new(self.state.media.root()))
            // Fallback
            .fallback(fallback::not_found_handler)
            .layer(session_layer)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Yatube starting on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router()).await?;

        Ok(())
    }
}
