//! User accounts and login sessions

use crate::crypto::{generate_token, hash_password, hash_token, verify_password};
use crate::db::{from_millis, Database};
use crate::models::{NewUser, User, UserId};
use crate::{Error, Result};
use chrono::Duration;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password_hash, date_joined";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        password_hash: row.get(5)?,
        date_joined: from_millis(row.get(6)?),
    })
}

fn select_user(conn: &Connection, clause: &str, param: &dyn rusqlite::ToSql) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);
    let user = conn.query_row(&sql, [param], user_from_row).optional()?;
    Ok(user)
}

impl Database {
    // ========================================================================
    // Users
    // ========================================================================

    /// Create a user; fails with `AlreadyExists` on a duplicate username
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let password_hash = hash_password(&new.password)?;
        let now = self.now();
        let conn = self.connection();
        let conn = conn.lock();

        if select_user(&conn, "username = ?1", &new.username)?.is_some() {
            return Err(Error::already_exists("user", &new.username));
        }

        conn.execute(
            "INSERT INTO users (username, first_name, last_name, email, password_hash, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                new.username,
                new.first_name,
                new.last_name,
                new.email,
                password_hash,
                now.timestamp_millis()
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!("Created user {} ({})", new.username, id);
        select_user(&conn, "id = ?1", &id)?.ok_or_else(|| Error::not_found("user", id))
    }

    pub fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let conn = self.connection();
        let conn = conn.lock();
        select_user(&conn, "id = ?1", &id)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = self.connection();
        let conn = conn.lock();
        select_user(&conn, "username = ?1", &username)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.connection();
        let conn = conn.lock();
        let sql = format!("SELECT {} FROM users ORDER BY username", USER_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Delete a user together with their posts, comments and follow edges
    pub fn delete_user(&self, id: UserId) -> Result<bool> {
        let conn = self.connection();
        let conn = conn.lock();
        let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if rows > 0 {
            info!("Deleted user {}", id);
        }
        Ok(rows > 0)
    }

    /// Look up a user by credentials
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = self.get_user_by_username(username)?;
        Ok(user.filter(|u| verify_password(password, &u.password_hash)))
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Start a session for `user_id`, returning the raw token for the cookie
    pub fn create_session(&self, user_id: UserId, ttl: Duration) -> Result<String> {
        let token = generate_token();
        let now = self.now();
        let conn = self.connection();
        let conn = conn.lock();

        conn.execute(
            "INSERT INTO sessions (token_hash, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                hash_token(&token),
                user_id,
                now.timestamp_millis(),
                (now + ttl).timestamp_millis()
            ],
        )?;

        debug!("Created session for user {}", user_id);
        Ok(token)
    }

    /// Resolve a session token to its user, ignoring expired sessions
    pub fn session_user(&self, token: &str) -> Result<Option<User>> {
        let now = self.now();
        let conn = self.connection();
        let conn = conn.lock();

        let sql = format!(
            "SELECT {} FROM users WHERE id = (
                SELECT user_id FROM sessions WHERE token_hash = ?1 AND expires_at > ?2
            )",
            USER_COLUMNS
        );
        let user = conn
            .query_row(
                &sql,
                params![hash_token(token), now.timestamp_millis()],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn delete_session(&self, token: &str) -> Result<()> {
        let conn = self.connection();
        let conn = conn.lock();
        conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?1",
            params![hash_token(token)],
        )?;
        Ok(())
    }

    /// Remove expired sessions
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let now = self.now();
        let conn = self.connection();
        let conn = conn.lock();
        let rows = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?1",
            params![now.timestamp_millis()],
        )?;
        Ok(rows)
    }
}
