//! Groups, posts, comments and follow edges

use crate::db::{from_millis, Database};
use crate::models::{
    Comment, CommentView, Follow, Group, GroupId, GroupSummary, NewGroup, Post, PostDraft, PostId,
    PostView, UserId, UserSummary,
};
use crate::paginator::{Page, Paginator};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, info};

/// Which posts a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(GroupId),
    Author(UserId),
    /// Posts by authors the given user follows
    FollowedBy(UserId),
}

impl PostFilter {
    fn where_clause(&self) -> (&'static str, Option<i64>) {
        match self {
            PostFilter::All => ("", None),
            PostFilter::Group(id) => ("WHERE p.group_id = :filter_id", Some(*id)),
            PostFilter::Author(id) => ("WHERE p.author_id = :filter_id", Some(*id)),
            PostFilter::FollowedBy(id) => (
                "WHERE p.author_id IN (SELECT author_id FROM follows WHERE user_id = :filter_id)",
                Some(*id),
            ),
        }
    }
}

const POST_VIEW_SELECT: &str = "
    SELECT p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image,
           u.username, u.first_name, u.last_name, g.title, g.slug
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id";

const POST_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

fn author_summary(username: String, first: String, last: String) -> UserSummary {
    let full = format!("{} {}", first, last).trim().to_string();
    UserSummary {
        id: 0,
        display_name: if full.is_empty() { username.clone() } else { full },
        username,
    }
}

fn post_view_from_row(row: &Row<'_>) -> rusqlite::Result<PostView> {
    let post = Post {
        id: row.get(0)?,
        text: row.get(1)?,
        pub_date: from_millis(row.get(2)?),
        author_id: row.get(3)?,
        group_id: row.get(4)?,
        image: row.get(5)?,
    };
    let author = UserSummary {
        id: post.author_id,
        ..author_summary(row.get(6)?, row.get(7)?, row.get(8)?)
    };
    let group = match (post.group_id, row.get::<_, Option<String>>(9)?) {
        (Some(id), Some(title)) => Some(GroupSummary {
            id,
            title,
            slug: row.get(10)?,
        }),
        _ => None,
    };
    Ok(PostView {
        post,
        author,
        group,
    })
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

fn load_post_view(conn: &Connection, id: PostId) -> Result<Option<PostView>> {
    let sql = format!("{} WHERE p.id = ?1", POST_VIEW_SELECT);
    let view = conn
        .query_row(&sql, params![id], post_view_from_row)
        .optional()?;
    Ok(view)
}

fn group_exists(conn: &Connection, id: GroupId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT id FROM post_groups WHERE id = ?1", params![id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(found.is_some())
}

impl Database {
    // ========================================================================
    // Groups
    // ========================================================================

    pub fn create_group(&self, new: &NewGroup) -> Result<Group> {
        let conn = self.connection();
        let conn = conn.lock();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM post_groups WHERE slug = ?1",
                params![new.slug],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(Error::already_exists("group", &new.slug));
        }

        conn.execute(
            "INSERT INTO post_groups (title, slug, description) VALUES (?1, ?2, ?3)",
            params![new.title, new.slug, new.description],
        )?;

        info!("Created group {}", new.slug);
        Ok(Group {
            id: conn.last_insert_rowid(),
            title: new.title.clone(),
            slug: new.slug.clone(),
            description: new.description.clone(),
        })
    }

    pub fn get_group(&self, id: GroupId) -> Result<Option<Group>> {
        let conn = self.connection();
        let conn = conn.lock();
        let group = conn
            .query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE id = ?1",
                params![id],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    pub fn get_group_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let conn = self.connection();
        let conn = conn.lock();
        let group = conn
            .query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE slug = ?1",
                params![slug],
                group_from_row,
            )
            .optional()?;
        Ok(group)
    }

    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let conn = self.connection();
        let conn = conn.lock();
        let mut stmt =
            conn.prepare("SELECT id, title, slug, description FROM post_groups ORDER BY title")?;
        let groups = stmt
            .query_map([], group_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(groups)
    }

    /// Delete a group; its posts stay but lose their group
    pub fn delete_group(&self, id: GroupId) -> Result<bool> {
        let conn = self.connection();
        let conn = conn.lock();
        let rows = conn.execute("DELETE FROM post_groups WHERE id = ?1", params![id])?;
        if rows > 0 {
            info!("Deleted group {}", id);
        }
        Ok(rows > 0)
    }

    // ========================================================================
    // Posts
    // ========================================================================

    /// Create a post stamped with the current clock time
    pub fn create_post(&self, author_id: UserId, draft: &PostDraft) -> Result<PostView> {
        let now = self.now();
        let conn = self.connection();
        let conn = conn.lock();

        if let Some(group_id) = draft.group_id {
            if !group_exists(&conn, group_id)? {
                return Err(Error::not_found("group", group_id));
            }
        }

        conn.execute(
            "INSERT INTO posts (text, pub_date, author_id, group_id, image) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                draft.text,
                now.timestamp_millis(),
                author_id,
                draft.group_id,
                draft.image
            ],
        )?;
        let id = conn.last_insert_rowid();

        info!("Created post {} by user {}", id, author_id);
        load_post_view(&conn, id)?.ok_or_else(|| Error::not_found("post", id))
    }

    /// Replace a post's text, group and image; the publication date is kept
    pub fn update_post(&self, id: PostId, draft: &PostDraft) -> Result<PostView> {
        let conn = self.connection();
        let conn = conn.lock();

        if let Some(group_id) = draft.group_id {
            if !group_exists(&conn, group_id)? {
                return Err(Error::not_found("group", group_id));
            }
        }

        let rows = conn.execute(
            "UPDATE posts SET text = ?1, group_id = ?2, image = ?3 WHERE id = ?4",
            params![draft.text, draft.group_id, draft.image, id],
        )?;
        if rows == 0 {
            return Err(Error::not_found("post", id));
        }

        info!("Updated post {}", id);
        load_post_view(&conn, id)?.ok_or_else(|| Error::not_found("post", id))
    }

    pub fn delete_post(&self, id: PostId) -> Result<bool> {
        let conn = self.connection();
        let conn = conn.lock();
        let rows = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        if rows > 0 {
            info!("Deleted post {}", id);
        }
        Ok(rows > 0)
    }

    pub fn get_post(&self, id: PostId) -> Result<Option<PostView>> {
        let conn = self.connection();
        let conn = conn.lock();
        load_post_view(&conn, id)
    }

    pub fn count_posts(&self, filter: PostFilter) -> Result<usize> {
        let conn = self.connection();
        let conn = conn.lock();
        let (clause, filter_id) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM posts p {}", clause);

        let mut named: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(filter_id) = filter_id.as_ref() {
            named.push((":filter_id", filter_id as &dyn ToSql));
        }
        let count: i64 = conn.query_row(&sql, named.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Newest-first posts matching `filter`, paginated
    ///
    /// `requested` is the raw `page` query value; out-of-range or malformed
    /// values resolve to the nearest valid page.
    pub fn posts_page(
        &self,
        filter: PostFilter,
        requested: Option<&str>,
        per_page: usize,
    ) -> Result<Page<PostView>> {
        let count = self.count_posts(filter)?;
        let paginator = Paginator::new(count, per_page);
        let number = paginator.resolve(requested);

        let conn = self.connection();
        let conn = conn.lock();
        let (clause, filter_id) = filter.where_clause();
        let sql = format!(
            "{} {} {} LIMIT :limit OFFSET :offset",
            POST_VIEW_SELECT, clause, POST_ORDER
        );

        let limit = paginator.per_page() as i64;
        let offset = paginator.offset(number) as i64;
        let mut named: Vec<(&str, &dyn ToSql)> = Vec::with_capacity(3);
        named.push((":limit", &limit as &dyn ToSql));
        named.push((":offset", &offset as &dyn ToSql));
        if let Some(filter_id) = filter_id.as_ref() {
            named.push((":filter_id", filter_id as &dyn ToSql));
        }

        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(named.as_slice(), post_view_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!(
            "Loaded page {}/{} ({} posts) for {:?}",
            number,
            paginator.num_pages(),
            posts.len(),
            filter
        );
        Ok(paginator.page(number, posts))
    }

    /// Every post matching `filter`, newest first
    pub fn list_posts(&self, filter: PostFilter) -> Result<Vec<PostView>> {
        let conn = self.connection();
        let conn = conn.lock();
        let (clause, filter_id) = filter.where_clause();
        let sql = format!("{} {} {}", POST_VIEW_SELECT, clause, POST_ORDER);

        let mut named: Vec<(&str, &dyn ToSql)> = Vec::new();
        if let Some(filter_id) = filter_id.as_ref() {
            named.push((":filter_id", filter_id as &dyn ToSql));
        }

        let mut stmt = conn.prepare(&sql)?;
        let posts = stmt
            .query_map(named.as_slice(), post_view_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(posts)
    }

    // ========================================================================
    // Comments
    // ========================================================================

    pub fn add_comment(&self, post_id: PostId, author_id: UserId, text: &str) -> Result<Comment> {
        let now = self.now();
        let conn = self.connection();
        let conn = conn.lock();

        if load_post_view(&conn, post_id)?.is_none() {
            return Err(Error::not_found("post", post_id));
        }

        conn.execute(
            "INSERT INTO comments (post_id, author_id, text, created) VALUES (?1, ?2, ?3, ?4)",
            params![post_id, author_id, text, now.timestamp_millis()],
        )?;

        let id = conn.last_insert_rowid();
        info!("User {} commented on post {}", author_id, post_id);
        Ok(Comment {
            id,
            post_id,
            author_id,
            text: text.to_string(),
            created: now,
        })
    }

    /// Comments on a post, newest first
    pub fn comments_for_post(&self, post_id: PostId) -> Result<Vec<CommentView>> {
        let conn = self.connection();
        let conn = conn.lock();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created,
                    u.username, u.first_name, u.last_name
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?1
             ORDER BY c.created DESC, c.id DESC",
        )?;

        let comments = stmt
            .query_map(params![post_id], |row| {
                let comment = Comment {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    author_id: row.get(2)?,
                    text: row.get(3)?,
                    created: from_millis(row.get(4)?),
                };
                let author = UserSummary {
                    id: comment.author_id,
                    ..author_summary(row.get(5)?, row.get(6)?, row.get(7)?)
                };
                Ok(CommentView { comment, author })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn count_comments(&self, post_id: PostId) -> Result<usize> {
        let conn = self.connection();
        let conn = conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    // ========================================================================
    // Follows
    // ========================================================================

    /// Get-or-create the edge `user_id -> author_id`
    ///
    /// Returns true if a new edge was created. Following yourself is a
    /// no-op.
    pub fn follow(&self, user_id: UserId, author_id: UserId) -> Result<bool> {
        if user_id == author_id {
            debug!("Ignoring self-follow for user {}", user_id);
            return Ok(false);
        }

        let conn = self.connection();
        let conn = conn.lock();
        let rows = conn.execute(
            "INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?1, ?2)",
            params![user_id, author_id],
        )?;

        if rows > 0 {
            info!("User {} now follows {}", user_id, author_id);
        }
        Ok(rows > 0)
    }

    /// Remove the edge `user_id -> author_id`, returning whether one existed
    pub fn unfollow(&self, user_id: UserId, author_id: UserId) -> Result<bool> {
        let conn = self.connection();
        let conn = conn.lock();
        let rows = conn.execute(
            "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
            params![user_id, author_id],
        )?;
        if rows > 0 {
            info!("User {} unfollowed {}", user_id, author_id);
        }
        Ok(rows > 0)
    }

    pub fn is_following(&self, user_id: UserId, author_id: UserId) -> Result<bool> {
        Ok(self.count_follows(user_id, author_id)? > 0)
    }

    /// Number of edges between a follower and an author (0 or 1)
    pub fn count_follows(&self, user_id: UserId, author_id: UserId) -> Result<usize> {
        let conn = self.connection();
        let conn = conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM follows WHERE user_id = ?1 AND author_id = ?2",
            params![user_id, author_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Edges where `user_id` is the follower
    pub fn list_follows(&self, user_id: UserId) -> Result<Vec<Follow>> {
        let conn = self.connection();
        let conn = conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, author_id FROM follows WHERE user_id = ?1 ORDER BY id",
        )?;
        let follows = stmt
            .query_map(params![user_id], |row| {
                Ok(Follow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    author_id: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(follows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{NewUser, User};
    use chrono::Duration;
    use std::sync::Arc;

    fn user(db: &Database, username: &str) -> User {
        db.create_user(&NewUser {
            username: username.to_string(),
            password: "password123".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn group(db: &Database, slug: &str) -> Group {
        db.create_group(&NewGroup {
            title: format!("Group {}", slug),
            slug: slug.to_string(),
            description: String::new(),
        })
        .unwrap()
    }

    fn text(text: &str) -> PostDraft {
        PostDraft {
            text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_posts_are_newest_first() {
        let clock = Arc::new(ManualClock::starting_now());
        let db = Database::open_memory().unwrap().with_clock(clock.clone());
        let author = user(&db, "leo");

        for i in 0..3 {
            db.create_post(author.id, &text(&format!("post {}", i))).unwrap();
            clock.advance(Duration::seconds(1));
        }

        let posts = db.list_posts(PostFilter::All).unwrap();
        let texts: Vec<_> = posts.iter().map(|p| p.post.text.as_str()).collect();
        assert_eq!(texts, vec!["post 2", "post 1", "post 0"]);
    }

    #[test]
    fn test_same_timestamp_breaks_ties_by_id() {
        let clock = Arc::new(ManualClock::starting_now());
        let db = Database::open_memory().unwrap().with_clock(clock);
        let author = user(&db, "leo");

        let first = db.create_post(author.id, &text("first")).unwrap();
        let second = db.create_post(author.id, &text("second")).unwrap();

        let posts = db.list_posts(PostFilter::All).unwrap();
        assert_eq!(posts[0].post.id, second.post.id);
        assert_eq!(posts[1].post.id, first.post.id);
    }

    #[test]
    fn test_posts_page_splits_twelve_posts() {
        let db = Database::open_memory().unwrap();
        let author = user(&db, "leo");
        for i in 0..12 {
            db.create_post(author.id, &text(&format!("post {}", i))).unwrap();
        }

        let first = db.posts_page(PostFilter::All, None, 10).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.count, 12);
        assert!(first.has_next);

        let second = db.posts_page(PostFilter::All, Some("2"), 10).unwrap();
        assert_eq!(second.len(), 2);

        let clamped = db.posts_page(PostFilter::All, Some("99"), 10).unwrap();
        assert_eq!(clamped.number, 2);
    }

    #[test]
    fn test_filters() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        let anna = user(&db, "anna");
        let cats = group(&db, "cats");

        db.create_post(
            leo.id,
            &PostDraft {
                group_id: Some(cats.id),
                ..text("in group")
            },
        )
        .unwrap();
        db.create_post(anna.id, &text("by anna")).unwrap();

        assert_eq!(db.count_posts(PostFilter::Group(cats.id)).unwrap(), 1);
        assert_eq!(db.count_posts(PostFilter::Author(anna.id)).unwrap(), 1);
        assert_eq!(db.count_posts(PostFilter::FollowedBy(anna.id)).unwrap(), 0);

        db.follow(anna.id, leo.id).unwrap();
        let feed = db.list_posts(PostFilter::FollowedBy(anna.id)).unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].post.text, "in group");
        assert_eq!(feed[0].group.as_ref().unwrap().slug, "cats");
        assert_eq!(feed[0].author.username, "leo");
    }

    #[test]
    fn test_create_post_rejects_unknown_group() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        let err = db
            .create_post(
                leo.id,
                &PostDraft {
                    group_id: Some(404),
                    ..text("orphan")
                },
            )
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_update_keeps_pub_date() {
        let clock = Arc::new(ManualClock::starting_now());
        let db = Database::open_memory().unwrap().with_clock(clock.clone());
        let leo = user(&db, "leo");
        let created = db.create_post(leo.id, &text("before")).unwrap();

        clock.advance(Duration::minutes(5));
        let updated = db
            .update_post(
                created.post.id,
                &PostDraft {
                    image: Some("posts/new.gif".to_string()),
                    ..text("after")
                },
            )
            .unwrap();

        assert_eq!(updated.post.text, "after");
        assert_eq!(updated.post.image.as_deref(), Some("posts/new.gif"));
        assert_eq!(
            updated.post.pub_date.timestamp_millis(),
            created.post.pub_date.timestamp_millis()
        );
        assert!(db.update_post(999, &text("x")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_follow_is_get_or_create() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        let anna = user(&db, "anna");

        assert!(db.follow(anna.id, leo.id).unwrap());
        assert!(!db.follow(anna.id, leo.id).unwrap());
        assert_eq!(db.count_follows(anna.id, leo.id).unwrap(), 1);
        assert!(db.is_following(anna.id, leo.id).unwrap());
        assert!(!db.is_following(leo.id, anna.id).unwrap());
    }

    #[test]
    fn test_self_follow_is_noop() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        assert!(!db.follow(leo.id, leo.id).unwrap());
        assert!(db.list_follows(leo.id).unwrap().is_empty());
    }

    #[test]
    fn test_unfollow() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        let anna = user(&db, "anna");
        db.follow(anna.id, leo.id).unwrap();

        assert!(db.unfollow(anna.id, leo.id).unwrap());
        assert!(!db.unfollow(anna.id, leo.id).unwrap());
        assert!(!db.is_following(anna.id, leo.id).unwrap());
    }

    #[test]
    fn test_comments_newest_first() {
        let clock = Arc::new(ManualClock::starting_now());
        let db = Database::open_memory().unwrap().with_clock(clock.clone());
        let leo = user(&db, "leo");
        let post = db.create_post(leo.id, &text("hello")).unwrap();

        db.add_comment(post.post.id, leo.id, "first").unwrap();
        clock.advance(Duration::seconds(1));
        db.add_comment(post.post.id, leo.id, "second").unwrap();

        let comments = db.comments_for_post(post.post.id).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.text, "second");
        assert_eq!(comments[0].author.username, "leo");
        assert!(db.add_comment(999, leo.id, "nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_deleting_group_nulls_post_group() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        let cats = group(&db, "cats");
        let post = db
            .create_post(
                leo.id,
                &PostDraft {
                    group_id: Some(cats.id),
                    ..text("cat post")
                },
            )
            .unwrap();

        assert!(db.delete_group(cats.id).unwrap());
        let post = db.get_post(post.post.id).unwrap().unwrap();
        assert_eq!(post.post.group_id, None);
        assert!(post.group.is_none());
    }

    #[test]
    fn test_deleting_user_cascades() {
        let db = Database::open_memory().unwrap();
        let leo = user(&db, "leo");
        let anna = user(&db, "anna");
        let post = db.create_post(anna.id, &text("anna's post")).unwrap();
        db.add_comment(post.post.id, leo.id, "nice").unwrap();
        db.follow(leo.id, anna.id).unwrap();

        assert!(db.delete_user(anna.id).unwrap());
        assert!(db.get_post(post.post.id).unwrap().is_none());
        assert_eq!(db.count_comments(post.post.id).unwrap(), 0);
        assert!(db.list_follows(leo.id).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_group_slug_rejected() {
        let db = Database::open_memory().unwrap();
        group(&db, "cats");
        let err = db
            .create_group(&NewGroup {
                title: "Cats again".to_string(),
                slug: "cats".to_string(),
                description: String::new(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyExists { .. }));
        assert!(db.get_group_by_slug("cats").unwrap().is_some());
        assert_eq!(db.list_groups().unwrap().len(), 1);
    }
}
