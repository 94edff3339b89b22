//! User Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use yatube_common::{Database, NewUser, PostFilter, User};

use crate::output::{print_item, print_list, print_success, OutputFormat, TableDisplay};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Subcommand)]
pub enum UserCommands {
    /// List all users
    List,

    /// Create a user
    Create {
        /// Username
        username: String,

        /// Password (at least 8 characters)
        #[arg(short, long, env = "YATUBE_PASSWORD", hide_env_values = true)]
        password: String,

        /// Email address
        #[arg(short, long, default_value = "")]
        email: String,

        /// First name
        #[arg(long, default_value = "")]
        first_name: String,

        /// Last name
        #[arg(long, default_value = "")]
        last_name: String,
    },

    /// Delete a user with their posts, comments and follows
    Delete {
        /// Username
        username: String,
    },
}

#[derive(Serialize)]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    pub posts: usize,
    pub joined: String,
}

impl UserDisplay {
    fn load(db: &Database, user: User) -> Result<Self> {
        let posts = db.count_posts(PostFilter::Author(user.id))?;
        Ok(Self {
            id: user.id,
            name: user.display_name(),
            username: user.username,
            email: user.email,
            posts,
            joined: user.date_joined.format("%Y-%m-%d %H:%M").to_string(),
        })
    }
}

impl TableDisplay for UserDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["ID", "Username", "Name", "Email", "Posts", "Joined"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.username.clone(),
            self.name.clone(),
            self.email.clone(),
            self.posts.to_string(),
            self.joined.clone(),
        ]
    }
}

pub fn execute(cmd: UserCommands, db: &Database, format: OutputFormat) -> Result<()> {
    match cmd {
        UserCommands::List => {
            let displays = db
                .list_users()?
                .into_iter()
                .map(|u| UserDisplay::load(db, u))
                .collect::<Result<Vec<_>>>()?;
            print_list(&displays, format);
        }

        UserCommands::Create {
            username,
            password,
            email,
            first_name,
            last_name,
        } => {
            if password.chars().count() < MIN_PASSWORD_LEN {
                bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
            }
            let user = db.create_user(&NewUser {
                username,
                first_name,
                last_name,
                email,
                password,
            })?;
            print_item(&UserDisplay::load(db, user)?, format);
        }

        UserCommands::Delete { username } => {
            let Some(user) = db.get_user_by_username(&username)? else {
                bail!("User not found: {}", username);
            };
            db.delete_user(user.id)?;
            print_success(&format!("Deleted user {}", username));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(db: &Database, username: &str, password: &str) -> Result<()> {
        execute(
            UserCommands::Create {
                username: username.to_string(),
                password: password.to_string(),
                email: String::new(),
                first_name: "Leo".to_string(),
                last_name: String::new(),
            },
            db,
            OutputFormat::Json,
        )
    }

    #[test]
    fn test_create_then_authenticate() {
        let db = Database::open_memory().unwrap();
        create(&db, "leo", "war-and-peace").unwrap();
        assert!(db.authenticate("leo", "war-and-peace").unwrap().is_some());
    }

    #[test]
    fn test_short_password_rejected() {
        let db = Database::open_memory().unwrap();
        assert!(create(&db, "leo", "short").is_err());
        assert!(db.get_user_by_username("leo").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = Database::open_memory().unwrap();
        create(&db, "leo", "war-and-peace").unwrap();
        assert!(create(&db, "leo", "anna-karenina").is_err());
    }

    #[test]
    fn test_delete() {
        let db = Database::open_memory().unwrap();
        create(&db, "leo", "war-and-peace").unwrap();
        execute(
            UserCommands::Delete {
                username: "leo".to_string(),
            },
            &db,
            OutputFormat::Plain,
        )
        .unwrap();
        assert!(db.list_users().unwrap().is_empty());
    }

    #[test]
    fn test_row_uses_display_name() {
        let db = Database::open_memory().unwrap();
        create(&db, "leo", "war-and-peace").unwrap();
        let user = db.get_user_by_username("leo").unwrap().unwrap();
        let display = UserDisplay::load(&db, user).unwrap();
        assert_eq!(display.row()[2], "Leo");
        assert_eq!(display.posts, 0);
    }
}
