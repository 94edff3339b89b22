//! Post, group, profile, comment and follow views

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use yatube_common::{PostDraft, PostFilter, PostId, PostView, User, POST_IMAGE_DIR};

use super::{post_url, profile_url, redirect, Context, PageQuery};
use crate::auth::{CurrentUser, RequireUser};
use crate::cache::{PageCache, INDEX_PAGE_FRAGMENT};
use crate::error::{WebError, WebResult};
use crate::forms::{CommentForm, Form, FormSubmission, PostForm, PostInput};
use crate::server::AppState;
use crate::templates::{self, Template, TemplateResponse};

fn parse_post_id(raw: &str) -> WebResult<PostId> {
    raw.parse::<PostId>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| WebError::not_found(format!("post {}", raw)))
}

fn load_post(state: &AppState, raw_id: &str) -> WebResult<PostView> {
    let post_id = parse_post_id(raw_id)?;
    state
        .db
        .get_post(post_id)?
        .ok_or_else(|| WebError::not_found(format!("post {}", post_id)))
}

fn load_author(state: &AppState, username: &str) -> WebResult<User> {
    state
        .db
        .get_user_by_username(username)?
        .ok_or_else(|| WebError::not_found(format!("user {}", username)))
}

// ============================================================================
// Listings
// ============================================================================

/// Feed of all posts; the post list fragment is served from the page cache
pub async fn index(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    query: PageQuery,
) -> WebResult<TemplateResponse> {
    let page = state.db.posts_page(
        PostFilter::All,
        query.page.as_deref(),
        state.config.page_size,
    )?;

    let key = PageCache::key(INDEX_PAGE_FRAGMENT, page.number);
    let fragment = state
        .cache
        .get_or_render(&key, || templates::post_list(&page))?;

    let context = Context::new().insert("page_obj", &page)?;
    Ok(TemplateResponse::new(
        Template::Index,
        context.into_map(),
        templates::index(user.as_ref(), &fragment),
    ))
}

pub async fn group_list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
    query: PageQuery,
) -> WebResult<TemplateResponse> {
    let group = state
        .db
        .get_group_by_slug(&slug)?
        .ok_or_else(|| WebError::not_found(format!("group {}", slug)))?;

    let page = state.db.posts_page(
        PostFilter::Group(group.id),
        query.page.as_deref(),
        state.config.page_size,
    )?;

    let html = templates::group_list(user.as_ref(), &group, &page);
    let context = Context::new()
        .insert("group", &group)?
        .insert("page_obj", &page)?;
    Ok(TemplateResponse::new(
        Template::GroupList,
        context.into_map(),
        html,
    ))
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(username): Path<String>,
    query: PageQuery,
) -> WebResult<TemplateResponse> {
    let author = load_author(&state, &username)?;
    let page = state.db.posts_page(
        PostFilter::Author(author.id),
        query.page.as_deref(),
        state.config.page_size,
    )?;

    let following = match &user {
        Some(viewer) => state.db.is_following(viewer.id, author.id)?,
        None => false,
    };

    let html = templates::profile(user.as_ref(), &author, &page, following);
    let context = Context::new()
        .insert("author", &author)?
        .insert("page_obj", &page)?
        .value("following", json!(following));
    Ok(TemplateResponse::new(Template::Profile, context.into_map(), html))
}

/// Posts by authors the current user follows
pub async fn follow_index(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    query: PageQuery,
) -> WebResult<TemplateResponse> {
    let page = state.db.posts_page(
        PostFilter::FollowedBy(user.id),
        query.page.as_deref(),
        state.config.page_size,
    )?;

    let html = templates::follow(Some(&user), &page);
    let context = Context::new().insert("page_obj", &page)?;
    Ok(TemplateResponse::new(Template::Follow, context.into_map(), html))
}

// ============================================================================
// Post detail and comments
// ============================================================================

/// Post detail page with `form` as the comment form
fn render_post_detail(
    state: &AppState,
    user: Option<&User>,
    raw_id: &str,
    form: Form,
) -> WebResult<TemplateResponse> {
    let post = load_post(state, raw_id)?;
    let comments = state.db.comments_for_post(post.post.id)?;
    let author_posts = state
        .db
        .count_posts(PostFilter::Author(post.post.author_id))?;

    let html = templates::post_detail(user, &post, author_posts, &comments, &form);
    let context = Context::new()
        .insert("post", &post)?
        .insert("comments", &comments)?
        .value("form", form.to_context())
        .value("author_posts", json!(author_posts));
    Ok(TemplateResponse::new(
        Template::PostDetail,
        context.into_map(),
        html,
    ))
}

pub async fn post_detail(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> WebResult<TemplateResponse> {
    render_post_detail(&state, user.as_ref(), &post_id, CommentForm::empty())
}

/// GET shows the detail page; the comment form itself posts here
pub async fn add_comment_page(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
) -> WebResult<TemplateResponse> {
    render_post_detail(&state, Some(&user), &post_id, CommentForm::empty())
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
    submission: FormSubmission,
) -> WebResult<Response> {
    match CommentForm::validate(&submission) {
        Ok(text) => {
            let post = load_post(&state, &post_id)?;
            state.db.add_comment(post.post.id, user.id, &text)?;
            Ok(redirect(&post_url(post.post.id)))
        }
        Err(form) => Ok(render_post_detail(&state, Some(&user), &post_id, form)?.into_response()),
    }
}

// ============================================================================
// Create and edit
// ============================================================================

fn render_post_form(user: &User, form: Form, post_id: Option<PostId>) -> TemplateResponse {
    let html = templates::create_post(Some(user), &form, post_id);
    let mut context = Context::new()
        .value("form", form.to_context())
        .value("is_edit", json!(post_id.is_some()));
    if let Some(post_id) = post_id {
        context = context.value("post_id", json!(post_id));
    }
    TemplateResponse::new(Template::CreatePost, context.into_map(), html)
}

/// Store the uploaded image, if any, then run `persist` with its
/// media-relative path. A freshly stored file is removed again when
/// `persist` fails.
async fn persist_with_image<T, F>(state: &AppState, input: &PostInput, persist: F) -> WebResult<T>
where
    F: FnOnce(Option<String>) -> yatube_common::Result<T>,
{
    let stored = match &input.image {
        Some(upload) => Some(
            state
                .media
                .save(POST_IMAGE_DIR, &upload.file_name, &upload.bytes)
                .await?,
        ),
        None => None,
    };

    match persist(stored.clone()) {
        Ok(value) => Ok(value),
        Err(e) => {
            if let Some(path) = &stored {
                if let Err(remove_err) = state.media.remove(path).await {
                    warn!("Failed to remove orphaned upload {}: {}", path, remove_err);
                }
            }
            Err(e.into())
        }
    }
}

pub async fn post_create_page(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
) -> WebResult<TemplateResponse> {
    let groups = state.db.list_groups()?;
    Ok(render_post_form(&user, PostForm::empty(&groups), None))
}

pub async fn post_create(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    submission: FormSubmission,
) -> WebResult<Response> {
    let groups = state.db.list_groups()?;
    let input = match PostForm::validate(&groups, &submission) {
        Ok(input) => input,
        Err(form) => return Ok(render_post_form(&user, form, None).into_response()),
    };

    let post = persist_with_image(&state, &input, |image| {
        state.db.create_post(
            user.id,
            &PostDraft {
                text: input.text.clone(),
                group_id: input.group_id,
                image,
            },
        )
    })
    .await?;

    info!("User {} published post {}", user.username, post.post.id);
    Ok(redirect(&profile_url(&user.username)))
}

pub async fn post_edit_page(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
) -> WebResult<Response> {
    let post = load_post(&state, &post_id)?;
    if post.post.author_id != user.id {
        return Ok(redirect(&post_url(post.post.id)));
    }

    let groups = state.db.list_groups()?;
    let form = PostForm::for_post(&groups, &post);
    Ok(render_post_form(&user, form, Some(post.post.id)).into_response())
}

pub async fn post_edit(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(post_id): Path<String>,
    submission: FormSubmission,
) -> WebResult<Response> {
    let post = load_post(&state, &post_id)?;
    if post.post.author_id != user.id {
        return Ok(redirect(&post_url(post.post.id)));
    }

    let groups = state.db.list_groups()?;
    let input = match PostForm::validate(&groups, &submission) {
        Ok(input) => input,
        Err(form) => {
            return Ok(render_post_form(&user, form, Some(post.post.id)).into_response())
        }
    };

    // Keep the current image unless a new one was uploaded
    persist_with_image(&state, &input, |image| {
        state.db.update_post(
            post.post.id,
            &PostDraft {
                text: input.text.clone(),
                group_id: input.group_id,
                image: image.or_else(|| post.post.image.clone()),
            },
        )
    })
    .await?;

    Ok(redirect(&post_url(post.post.id)))
}

// ============================================================================
// Follows
// ============================================================================

pub async fn profile_follow(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> WebResult<Response> {
    let author = load_author(&state, &username)?;
    state.db.follow(user.id, author.id)?;
    Ok(redirect(&profile_url(&author.username)))
}

pub async fn profile_unfollow(
    State(state): State<Arc<AppState>>,
    RequireUser(user): RequireUser,
    Path(username): Path<String>,
) -> WebResult<Response> {
    let author = load_author(&state, &username)?;
    state.db.unfollow(user.id, author.id)?;
    Ok(redirect(&profile_url(&author.username)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WebConfig;
    use crate::forms::UploadedFile;
    use crate::server::WebServer;
    use bytes::Bytes;
    use yatube_common::{Database, Error};

    fn state() -> (Arc<AppState>, tempfile::TempDir) {
        let media = tempfile::tempdir().unwrap();
        let config = WebConfig {
            media_root: media.path().to_path_buf(),
            ..Default::default()
        };
        let server = WebServer::with_database(config, Database::open_memory().unwrap());
        (server.state(), media)
    }

    fn input_with_image() -> PostInput {
        PostInput {
            text: "text".to_string(),
            group_id: None,
            image: Some(UploadedFile {
                file_name: "cat.gif".to_string(),
                content_type: Some("image/gif".to_string()),
                bytes: Bytes::from_static(b"GIF89a"),
            }),
        }
    }

    fn stored_files(media: &tempfile::TempDir) -> usize {
        std::fs::read_dir(media.path().join(POST_IMAGE_DIR))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn test_failed_insert_removes_stored_image() {
        let (state, media) = state();

        let result: WebResult<()> =
            persist_with_image(&state, &input_with_image(), |image| {
                assert_eq!(image.as_deref(), Some("posts/cat.gif"));
                Err(Error::not_found("group", 7))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(stored_files(&media), 0);
    }

    #[tokio::test]
    async fn test_successful_insert_keeps_stored_image() {
        let (state, media) = state();

        let path = persist_with_image(&state, &input_with_image(), Ok)
            .await
            .unwrap();

        assert_eq!(path.as_deref(), Some("posts/cat.gif"));
        assert_eq!(stored_files(&media), 1);
    }

    #[test]
    fn test_parse_post_id() {
        assert_eq!(parse_post_id("12").unwrap(), 12);
        assert!(matches!(parse_post_id("0"), Err(WebError::NotFound(_))));
        assert!(matches!(parse_post_id("abc"), Err(WebError::NotFound(_))));
    }
}
