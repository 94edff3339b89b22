//! SQLite database for Yatube state persistence
//!
//! Typed queries live next to the records they load: see `users.rs` and
//! `posts.rs`. This module owns the connection, the schema, and the
//! page-cache table.

use crate::clock::{SharedClock, SystemClock};
use crate::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Database wrapper for state persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    clock: SharedClock,
}

impl Database {
    /// Expose the underlying connection for callers that need raw SQL.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }

    /// Current instant according to the database clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path.as_ref())?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self::from_connection(conn)?;
        info!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(SystemClock),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Replace the clock used for timestamps and cache expiry
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Users
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT '',
                email TEXT NOT NULL DEFAULT '',
                password_hash TEXT NOT NULL,
                date_joined INTEGER NOT NULL
            );

            -- Groups posts can be filed under
            CREATE TABLE IF NOT EXISTS post_groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL DEFAULT ''
            );

            -- Posts
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                pub_date INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                group_id INTEGER,
                image TEXT,
                FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY(group_id) REFERENCES post_groups(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_pub_date ON posts(pub_date DESC, id DESC);
            CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author_id);
            CREATE INDEX IF NOT EXISTS idx_posts_group ON posts(group_id);

            -- Comments
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                post_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                text TEXT NOT NULL,
                created INTEGER NOT NULL,
                FOREIGN KEY(post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);

            -- Follow edges (follower -> author)
            CREATE TABLE IF NOT EXISTS follows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                UNIQUE(user_id, author_id),
                CHECK(user_id <> author_id),
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY(author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_follows_author ON follows(author_id);

            -- Login sessions
            CREATE TABLE IF NOT EXISTS sessions (
                token_hash TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at);

            -- Rendered page fragments
            CREATE TABLE IF NOT EXISTS page_cache (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    // ========================================================================
    // Page cache store
    // ========================================================================

    /// Get a cached fragment that has not expired at `now`
    pub fn cache_get(&self, key: &str, now: DateTime<Utc>) -> Result<Option<String>> {
        let conn = self.conn.lock();

        let body = conn
            .query_row(
                "SELECT body FROM page_cache WHERE key = ?1 AND expires_at > ?2",
                params![key, now.timestamp_millis()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(body)
    }

    /// Store a fragment until `expires_at`
    pub fn cache_set(&self, key: &str, body: &str, expires_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute(
            "INSERT OR REPLACE INTO page_cache (key, body, expires_at) VALUES (?1, ?2, ?3)",
            params![key, body, expires_at.timestamp_millis()],
        )?;

        Ok(())
    }

    /// Drop every cached fragment, returning how many were removed
    pub fn cache_clear(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM page_cache", [])?;
        debug!("Cleared {} cached fragments", rows);
        Ok(rows)
    }

    /// Remove expired fragments
    pub fn cache_purge_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM page_cache WHERE expires_at <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(rows)
    }
}

/// Convert a stored millisecond timestamp back to a `DateTime`
pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    #[test]
    fn test_schema_is_idempotent() {
        let db = Database::open_memory().unwrap();
        db.init_schema().unwrap();
        db.init_schema().unwrap();
    }

    #[test]
    fn test_open_file_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("yatube.db");
        let db = Database::open(&path).unwrap();
        drop(db);
        assert!(path.exists());
    }

    #[test]
    fn test_cache_entries_expire() {
        let clock = Arc::new(ManualClock::starting_now());
        let db = Database::open_memory().unwrap().with_clock(clock.clone());

        let expires = db.now() + Duration::seconds(20);
        db.cache_set("index_page:1", "<ul></ul>", expires).unwrap();
        assert_eq!(
            db.cache_get("index_page:1", db.now()).unwrap().as_deref(),
            Some("<ul></ul>")
        );

        clock.advance(Duration::seconds(20));
        assert!(db.cache_get("index_page:1", db.now()).unwrap().is_none());
        assert_eq!(db.cache_purge_expired(db.now()).unwrap(), 1);
    }

    #[test]
    fn test_cache_clear() {
        let db = Database::open_memory().unwrap();
        let expires = db.now() + Duration::seconds(60);
        db.cache_set("a", "1", expires).unwrap();
        db.cache_set("b", "2", expires).unwrap();

        assert_eq!(db.cache_clear().unwrap(), 2);
        assert!(db.cache_get("a", db.now()).unwrap().is_none());
    }
}
