//! Web server configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use yatube_common::DEFAULT_PAGE_SIZE;

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// HTTP listen address
    pub listen: String,

    /// SQLite database path
    pub db_path: PathBuf,

    /// Directory uploaded files are written to and served from
    pub media_root: PathBuf,

    /// Posts per page on every listing
    pub page_size: usize,

    /// Page cache settings
    pub cache: CacheConfig,

    /// Session settings
    pub session: SessionConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8000".to_string(),
            db_path: yatube_common::default_db_path(),
            media_root: yatube_common::default_media_root(),
            page_size: DEFAULT_PAGE_SIZE,
            cache: CacheConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

/// Page cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a rendered fragment stays fresh
    pub timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { timeout_secs: 20 }
    }
}

/// Login session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session lifetime in hours
    pub ttl_hours: i64,

    /// Mark the session cookie `Secure`
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_hours: 24 * 14,
            secure_cookie: false,
        }
    }
}

impl WebConfig {
    /// Load configuration from file, falling back to defaults if it is absent
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn cache_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.cache.timeout_secs as i64)
    }

    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session.ttl_hours)
    }
}

/// Default configuration file path
pub fn default_config_path() -> PathBuf {
    yatube_common::default_data_dir().join("config.toml")
}
