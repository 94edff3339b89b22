//! Rendered-fragment cache with a fixed timeout
//!
//! Entries live in the `page_cache` table and expire according to the
//! database clock, so tests drive expiry with a manual clock.

use chrono::Duration;
use tracing::debug;
use yatube_common::{Database, Result};

/// Fragment name of the index post list
pub const INDEX_PAGE_FRAGMENT: &str = "index_page";

#[derive(Clone)]
pub struct PageCache {
    db: Database,
    timeout: Duration,
}

impl PageCache {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// Cache key for a fragment rendered for a resolved page number
    pub fn key(fragment: &str, page: usize) -> String {
        format!("{}:{}", fragment, page)
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.db.cache_get(key, self.db.now())
    }

    pub fn set(&self, key: &str, body: &str) -> Result<()> {
        self.db.cache_set(key, body, self.db.now() + self.timeout)
    }

    /// Return the cached fragment or render, store and return a fresh one
    pub fn get_or_render<F>(&self, key: &str, render: F) -> Result<String>
    where
        F: FnOnce() -> String,
    {
        if let Some(body) = self.get(key)? {
            debug!("Page cache hit: {}", key);
            return Ok(body);
        }
        debug!("Page cache miss: {}", key);
        let body = render();
        self.set(key, &body)?;
        Ok(body)
    }

    /// Drop every cached fragment
    pub fn clear(&self) -> Result<usize> {
        self.db.cache_clear()
    }
}
