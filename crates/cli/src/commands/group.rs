//! Group Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use yatube_common::{Database, Group, NewGroup, PostFilter};

use crate::output::{print_item, print_list, print_success, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum GroupCommands {
    /// List all groups
    List,

    /// Create a new group
    Create {
        /// Group title
        #[arg(short, long)]
        title: String,

        /// URL slug (letters, digits, '-' and '_')
        #[arg(short, long)]
        slug: String,

        /// Description
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Delete a group; its posts are kept without a group
    Delete {
        /// Group slug
        slug: String,
    },
}

#[derive(Serialize)]
pub struct GroupDisplay {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub posts: usize,
}

impl GroupDisplay {
    fn load(db: &Database, group: Group) -> Result<Self> {
        let posts = db.count_posts(PostFilter::Group(group.id))?;
        Ok(Self {
            id: group.id,
            title: group.title,
            slug: group.slug,
            description: group.description,
            posts,
        })
    }
}

impl TableDisplay for GroupDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Title", "Slug", "Posts", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.slug.clone(),
            self.posts.to_string(),
            self.description.chars().take(40).collect(),
        ]
    }
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn execute(cmd: GroupCommands, db: &Database, format: OutputFormat) -> Result<()> {
    match cmd {
        GroupCommands::List => {
            let displays = db
                .list_groups()?
                .into_iter()
                .map(|g| GroupDisplay::load(db, g))
                .collect::<Result<Vec<_>>>()?;
            print_list(&displays, format);
        }

        GroupCommands::Create {
            title,
            slug,
            description,
        } => {
            if !valid_slug(&slug) {
                bail!("Invalid slug: {}", slug);
            }
            let group = db.create_group(&NewGroup {
                title,
                slug,
                description,
            })?;
            print_item(&GroupDisplay::load(db, group)?, format);
        }

        GroupCommands::Delete { slug } => {
            let Some(group) = db.get_group_by_slug(&slug)? else {
                bail!("Group not found: {}", slug);
            };
            db.delete_group(group.id)?;
            print_success(&format!("Deleted group {}", slug));
        }
    }
    Ok(())
}
