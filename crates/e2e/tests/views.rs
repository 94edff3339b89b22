//! Page contexts: pagination, records and forms

use axum::http::StatusCode;
use serde_json::json;
use test_case::test_case;
use yatube_common::{FieldKind, Group, PostDraft, PostView, User};
use yatube_e2e::{attrs, AttributeSet, ContextExpectation, Role, TestApp, UrlDescriptor};

struct Seeded {
    app: TestApp,
    user: User,
    group: Group,
    /// Newest post; carries an image
    post: PostView,
}

/// Twelve grouped posts by one user; the newest has an image
fn seeded() -> Seeded {
    let app = TestApp::new().unwrap();
    let user = app.create_user("testusername").unwrap();
    let group = app
        .create_group("Test group", "test-slug", "test description")
        .unwrap();
    let mut last = None;
    for i in 0..12 {
        last = Some(app.create_post(&user, &format!("Post {}", i), Some(&group)).unwrap());
    }
    let draft = PostDraft {
        text: last.as_ref().unwrap().post.text.clone(),
        group_id: Some(group.id),
        image: Some("posts/test.gif".to_string()),
    };
    let post = app.db.update_post(last.unwrap().post.id, &draft).unwrap();
    Seeded {
        app,
        user,
        group,
        post,
    }
}

fn post_needle(post: &PostView) -> AttributeSet {
    attrs([
        ("text", json!(post.post.text)),
        ("group_id", json!(post.post.group_id)),
        ("image", json!(post.post.image)),
    ])
}

#[tokio::test]
async fn test_contexts_as_author() {
    let s = seeded();
    let needle = post_needle(&s.post);
    let post_form = [
        ("text", FieldKind::Char),
        ("group", FieldKind::Choice),
        ("image", FieldKind::Image),
    ];

    let urls = vec![
        UrlDescriptor::builder("/")
            .context([
                ContextExpectation::length("page_obj", 10),
                ContextExpectation::contains("page_obj", [needle.clone()]).unwrap(),
            ])
            .description("feed, first page")
            .build(),
        UrlDescriptor::builder("/?page=2")
            .context([ContextExpectation::length("page_obj", 2)])
            .description("feed, second page")
            .build(),
        UrlDescriptor::builder(format!("/group/{}/", s.group.slug))
            .context([
                ContextExpectation::attributes(
                    "group",
                    attrs([
                        ("title", "Test group"),
                        ("slug", "test-slug"),
                        ("description", "test description"),
                    ]),
                ),
                ContextExpectation::length("page_obj", 10),
                ContextExpectation::contains("page_obj", [needle.clone()]).unwrap(),
            ])
            .description("group page")
            .build(),
        UrlDescriptor::builder(format!("/profile/{}/", s.user.username))
            .context([
                ContextExpectation::attributes(
                    "author",
                    attrs([("id", json!(s.user.id)), ("username", json!(s.user.username))]),
                ),
                ContextExpectation::length("page_obj", 10),
                ContextExpectation::contains("page_obj", [needle.clone()]).unwrap(),
                ContextExpectation::exact("following", false),
            ])
            .description("profile")
            .build(),
        UrlDescriptor::builder(format!("/posts/{}/", s.post.post.id))
            .context([
                ContextExpectation::attributes("post", needle.clone()),
                ContextExpectation::form("form", [("text", FieldKind::Char)])
                    .with_description("comment form"),
                ContextExpectation::exact("author_posts", 12),
            ])
            .description("post detail")
            .build(),
        UrlDescriptor::builder(format!("/posts/{}/edit/", s.post.post.id))
            .context([
                ContextExpectation::form("form", post_form),
                ContextExpectation::exact("is_edit", true),
            ])
            .description("post edit")
            .build(),
        UrlDescriptor::builder("/create/")
            .context([
                ContextExpectation::form("form", post_form),
                ContextExpectation::exact("is_edit", false),
            ])
            .description("post create")
            .build(),
    ];

    let mut runner = s.app.runner(&s.user, &s.user).unwrap();
    runner
        .run_roles(&urls, &[Role::Author])
        .await
        .into_result()
        .unwrap();
}

#[test_case("/", 10 ; "first page")]
#[test_case("/?page=2", 2 ; "second page")]
#[test_case("/?page=3", 2 ; "past the end is the last page")]
#[test_case("/?page=abc", 10 ; "non numeric is the first page")]
#[test_case("/?page=0", 10 ; "zero is the first page")]
#[test_case("/?page=999999999999999999999", 2 ; "huge number is the last page")]
#[test_case("/?page=1&page=2", 2 ; "repeated page takes the last value")]
#[tokio::test]
async fn test_feed_pagination(url: &str, expected: usize) {
    let s = seeded();
    let mut client = s.app.guest();
    let response = client.get(url).await.unwrap();
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.template.as_deref(), Some("posts/index.html"));
    ContextExpectation::length("page_obj", expected)
        .evaluate(&response.context)
        .unwrap();
}

#[tokio::test]
async fn test_post_shows_on_its_pages_only() {
    let app = TestApp::new().unwrap();
    let user = app.create_user("testuser").unwrap();
    let group = app.create_group("Test group", "test-slug", "test").unwrap();
    let other = app.create_group("Other group", "other-group", "other").unwrap();
    app.create_post(&user, "text", Some(&group)).unwrap();

    let in_list = ContextExpectation::contains(
        "page_obj",
        [attrs([
            ("text", json!("text")),
            ("author_id", json!(user.id)),
            ("group_id", json!(group.id)),
        ])],
    )
    .unwrap();

    let urls = vec![
        UrlDescriptor::builder("/").context([in_list.clone()]).build(),
        UrlDescriptor::builder(format!("/group/{}/", group.slug))
            .context([in_list.clone()])
            .build(),
        UrlDescriptor::builder(format!("/profile/{}/", user.username))
            .context([in_list])
            .build(),
        UrlDescriptor::builder(format!("/group/{}/", other.slug))
            .context([ContextExpectation::length("page_obj", 0)])
            .description("the post must not leak into another group")
            .build(),
    ];

    let mut runner = app.runner(&user, &user).unwrap();
    runner
        .run_roles(&urls, &Role::ALL)
        .await
        .into_result()
        .unwrap();
}

#[tokio::test]
async fn test_comment_shows_on_post_detail() {
    let app = TestApp::new().unwrap();
    let user = app.create_user("commenter").unwrap();
    let post = app.create_post(&user, "test text", None).unwrap();
    app.db
        .add_comment(post.post.id, user.id, "test comment")
        .unwrap();

    let url = UrlDescriptor::builder(format!("/posts/{}/", post.post.id))
        .context([
            ContextExpectation::length("comments", 1),
            ContextExpectation::contains(
                "comments",
                [attrs([
                    ("post_id", json!(post.post.id)),
                    ("author_id", json!(user.id)),
                    ("text", json!("test comment")),
                ])],
            )
            .unwrap(),
        ])
        .build();

    let mut client = app.client(&user).unwrap();
    let response = client.get(&url.url).await.unwrap();
    for expectation in &url.context {
        expectation.evaluate(&response.context).unwrap();
    }
}
