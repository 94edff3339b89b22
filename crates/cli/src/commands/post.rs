//! Post Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use yatube_common::{Database, PostFilter, PostView};

use crate::output::{print_list, OutputFormat, TableDisplay};

#[derive(Subcommand)]
pub enum PostCommands {
    /// List posts, newest first
    List {
        /// Only posts by this author
        #[arg(short, long)]
        author: Option<String>,

        /// Only posts in this group
        #[arg(short, long, conflicts_with = "author")]
        group: Option<String>,

        /// Maximum number of posts to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Serialize)]
pub struct PostDisplay {
    pub id: i64,
    pub author: String,
    pub group: Option<String>,
    pub published: String,
    pub text: String,
    pub image: Option<String>,
}

impl From<PostView> for PostDisplay {
    fn from(view: PostView) -> Self {
        Self {
            id: view.post.id,
            published: view.post.pub_date.format("%Y-%m-%d %H:%M").to_string(),
            text: view.post.to_string(),
            author: view.author.username,
            group: view.group.map(|g| g.slug),
            image: view.post.image,
        }
    }
}

impl TableDisplay for PostDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Author", "Group", "Published", "Text", "Image"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.author.clone(),
            self.group.clone().unwrap_or_else(|| "-".to_string()),
            self.published.clone(),
            self.text.clone(),
            self.image.clone().unwrap_or_else(|| "-".to_string()),
        ]
    }
}

fn resolve_filter(db: &Database, author: Option<&str>, group: Option<&str>) -> Result<PostFilter> {
    if let Some(username) = author {
        let Some(user) = db.get_user_by_username(username)? else {
            bail!("User not found: {}", username);
        };
        return Ok(PostFilter::Author(user.id));
    }
    if let Some(slug) = group {
        let Some(group) = db.get_group_by_slug(slug)? else {
            bail!("Group not found: {}", slug);
        };
        return Ok(PostFilter::Group(group.id));
    }
    Ok(PostFilter::All)
}

pub fn execute(cmd: PostCommands, db: &Database, format: OutputFormat) -> Result<()> {
    match cmd {
        PostCommands::List {
            author,
            group,
            limit,
        } => {
            let filter = resolve_filter(db, author.as_deref(), group.as_deref())?;
            let displays: Vec<PostDisplay> = db
                .list_posts(filter)?
                .into_iter()
                .take(limit)
                .map(PostDisplay::from)
                .collect();
            print_list(&displays, format);
        }
    }
    Ok(())
}
