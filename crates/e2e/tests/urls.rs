//! Status and template of every route, for every role

mod common;

use axum::http::StatusCode;
use common::Blog;
use yatube_e2e::{Role, UrlDescriptor};

const LOGIN: &str = "users/login.html";

fn route_map(blog: &Blog) -> Vec<UrlDescriptor> {
    let profile = format!("/profile/{}/", blog.author.username);
    vec![
        UrlDescriptor::builder("/")
            .default_status(StatusCode::OK)
            .default_template("posts/index.html")
            .description("feed")
            .build(),
        UrlDescriptor::builder(format!("/group/{}/", blog.group.slug))
            .default_status(StatusCode::OK)
            .default_template("posts/group_list.html")
            .description("group page")
            .build(),
        UrlDescriptor::builder(profile.clone())
            .default_status(StatusCode::OK)
            .default_template("posts/profile.html")
            .description("profile of the author of one post")
            .build(),
        UrlDescriptor::builder(blog.post_url(""))
            .default_status(StatusCode::OK)
            .default_template("posts/post_detail.html")
            .description("post detail")
            .build(),
        UrlDescriptor::builder(blog.post_url("edit/"))
            .role(Role::Guest, StatusCode::FOUND, LOGIN)
            .role(Role::Authorized, StatusCode::FOUND, "posts/post_detail.html")
            .role(Role::Author, StatusCode::OK, "posts/create_post.html")
            .description("post edit, author only")
            .build(),
        UrlDescriptor::builder("/create/")
            .default_status(StatusCode::OK)
            .default_template("posts/create_post.html")
            .role(Role::Guest, StatusCode::FOUND, LOGIN)
            .description("post create, logged in only")
            .build(),
        UrlDescriptor::builder(blog.post_url("comment/"))
            .default_status(StatusCode::OK)
            .default_template("posts/post_detail.html")
            .role(Role::Guest, StatusCode::FOUND, LOGIN)
            .description("add comment")
            .build(),
        UrlDescriptor::builder("/follow/")
            .default_status(StatusCode::OK)
            .default_template("posts/follow.html")
            .role(Role::Guest, StatusCode::FOUND, LOGIN)
            .description("followed authors feed")
            .build(),
        UrlDescriptor::builder(format!("{}follow/", profile))
            .default_status(StatusCode::FOUND)
            .default_template("posts/profile.html")
            .role(Role::Guest, StatusCode::FOUND, LOGIN)
            .description("follow the author")
            .build(),
        UrlDescriptor::builder(format!("{}unfollow/", profile))
            .default_status(StatusCode::FOUND)
            .default_template("posts/profile.html")
            .role(Role::Guest, StatusCode::FOUND, LOGIN)
            .description("unfollow the author")
            .build(),
    ]
}

#[tokio::test]
async fn test_route_map_for_every_role() {
    let blog = Blog::new().unwrap();
    let mut runner = blog.app.runner(&blog.reader, &blog.author).unwrap();

    let result = runner.run(&route_map(&blog)).await;
    assert_eq!(result.total, 30);
    result.into_result().unwrap();
}

#[tokio::test]
async fn test_guest_create_redirects_to_login() {
    let blog = Blog::new().unwrap();
    let mut guest = blog.app.guest();

    let first = guest.get("/create/").await.unwrap();
    assert_eq!(first.status, StatusCode::FOUND);
    assert_eq!(
        first.location.as_deref(),
        Some("/auth/login/?next=%2Fcreate%2F")
    );

    let last = guest.get_follow("/create/").await.unwrap();
    assert_eq!(last.template.as_deref(), Some(LOGIN));
    assert_eq!(last.context_value("next").unwrap(), "/create/");
    assert_eq!(last.redirect_chain.len(), 1);
}

#[tokio::test]
async fn test_non_owner_edit_redirects_to_detail() {
    let blog = Blog::new().unwrap();
    let mut reader = blog.app.client(&blog.reader).unwrap();

    let response = reader.get(&blog.post_url("edit/")).await.unwrap();
    assert_eq!(response.status, StatusCode::FOUND);
    assert_eq!(response.location.unwrap(), blog.post_url(""));
}

#[tokio::test]
async fn test_failing_descriptor_does_not_stop_the_run() {
    let blog = Blog::new().unwrap();
    let mut runner = blog.app.runner(&blog.reader, &blog.author).unwrap();

    let urls = vec![
        UrlDescriptor::builder("/create/")
            .default_status(StatusCode::OK)
            .description("wrong on purpose for guests")
            .build(),
        UrlDescriptor::builder("/about/tech/")
            .default_status(StatusCode::OK)
            .default_template("about/tech.html")
            .build(),
    ];

    let result = runner.run(&urls).await;
    assert_eq!(result.total, 6);
    assert_eq!(result.failed, 1);
    assert_eq!(result.passed, 5);

    let failure = result.failures().next().unwrap();
    assert_eq!(failure.role, Role::Guest);
    assert_eq!(failure.url, "/create/");
    assert!(failure.failures[0].contains("expected 200, got 302"));

    let report = result.report();
    assert!(report.contains("wrong on purpose for guests"), "{}", report);
    assert!(result.into_result().is_err());
}
