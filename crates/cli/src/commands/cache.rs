//! Page cache commands

use anyhow::Result;
use clap::Subcommand;
use yatube_common::Database;

use crate::output::{print_message, OutputFormat};

#[derive(Subcommand)]
pub enum CacheCommands {
    /// Drop every cached page fragment
    Clear,

    /// Drop only expired fragments
    Purge,
}

pub fn execute(cmd: CacheCommands, db: &Database, format: OutputFormat) -> Result<()> {
    match cmd {
        CacheCommands::Clear => {
            let removed = db.cache_clear()?;
            print_message(&format!("Cleared {} cached fragment(s)", removed), format);
        }
        CacheCommands::Purge => {
            let removed = db.cache_purge_expired(db.now())?;
            print_message(&format!("Purged {} expired fragment(s)", removed), format);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_clear_and_purge() {
        let db = Database::open_memory().unwrap();
        let now = db.now();
        db.cache_set("index_page:1", "<p>old</p>", now - Duration::seconds(1))
            .unwrap();
        db.cache_set("index_page:2", "<p>new</p>", now + Duration::seconds(20))
            .unwrap();

        execute(CacheCommands::Purge, &db, OutputFormat::Plain).unwrap();
        assert!(db.cache_get("index_page:2", now).unwrap().is_some());

        execute(CacheCommands::Clear, &db, OutputFormat::Plain).unwrap();
        assert!(db.cache_get("index_page:2", now).unwrap().is_none());
    }
}
