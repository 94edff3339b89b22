//! Database overview

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use yatube_common::{Database, PostFilter};

use crate::output::OutputFormat;

#[derive(Debug, Serialize, PartialEq)]
pub struct Summary {
    pub database: String,
    pub users: usize,
    pub groups: usize,
    pub posts: usize,
    pub expired_cache_entries: usize,
}

pub fn summarize(db: &Database, path: &Path) -> Result<Summary> {
    let users = db.list_users()?.len();
    let groups = db.list_groups()?.len();
    let posts = db.count_posts(PostFilter::All)?;
    let expired_cache_entries = db.cache_purge_expired(db.now())?;
    Ok(Summary {
        database: path.display().to_string(),
        users,
        groups,
        posts,
        expired_cache_entries,
    })
}

pub fn execute(db: &Database, path: &Path, format: OutputFormat) -> Result<()> {
    let summary = summarize(db, path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&summary)?),
        OutputFormat::Table | OutputFormat::Plain => {
            println!("{}", " Yatube".bold());
            println!("   Database: {}", summary.database.green());
            println!("   Users:    {}", summary.users);
            println!("   Groups:   {}", summary.groups);
            println!("   Posts:    {}", summary.posts);
            if summary.expired_cache_entries > 0 {
                println!(
                    "   {}",
                    format!("Purged {} expired cache entries", summary.expired_cache_entries)
                        .dimmed()
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yatube_common::NewUser;

    #[test]
    fn test_summary_counts() {
        let db = Database::open_memory().unwrap();
        db.create_user(&NewUser {
            username: "leo".to_string(),
            password: "war-and-peace".to_string(),
            ..Default::default()
        })
        .unwrap();

        let summary = summarize(&db, Path::new(":memory:")).unwrap();
        assert_eq!(
            summary,
            Summary {
                database: ":memory:".to_string(),
                users: 1,
                groups: 0,
                posts: 0,
                expired_cache_entries: 0,
            }
        );
    }
}
