//! Server-side page rendering
//!
//! Views hand a [`Template`] and a JSON context to [`TemplateResponse`].
//! The response carries the HTML body and, as a response extension, a
//! [`RenderedPage`] with the template name and context so in-process
//! clients can inspect what was rendered.

use crate::forms::{escape_attr, escape_html, Form};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::{Map, Value};
use yatube_common::{CommentView, Group, Page, PostView, User};

/// Page templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Index,
    GroupList,
    Profile,
    PostDetail,
    CreatePost,
    Follow,
    AboutAuthor,
    AboutTech,
    Signup,
    Login,
    LoggedOut,
    NotFound,
}

impl Template {
    pub fn name(&self) -> &'static str {
        match self {
            Template::Index => "posts/index.html",
            Template::GroupList => "posts/group_list.html",
            Template::Profile => "posts/profile.html",
            Template::PostDetail => "posts/post_detail.html",
            Template::CreatePost => "posts/create_post.html",
            Template::Follow => "posts/follow.html",
            Template::AboutAuthor => "about/author.html",
            Template::AboutTech => "about/tech.html",
            Template::Signup => "users/signup.html",
            Template::Login => "users/login.html",
            Template::LoggedOut => "users/logged_out.html",
            Template::NotFound => "core/404.html",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Template name and context of a rendered response
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    pub template: String,
    pub context: Value,
}

/// A rendered HTML page
#[derive(Debug, Clone)]
pub struct TemplateResponse {
    template: Template,
    status: StatusCode,
    context: Map<String, Value>,
    html: String,
}

impl TemplateResponse {
    pub fn new(template: Template, context: Map<String, Value>, html: String) -> Self {
        Self {
            template,
            status: StatusCode::OK,
            context,
            html,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }
}

impl IntoResponse for TemplateResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Html(self.html)).into_response();
        response.extensions_mut().insert(RenderedPage {
            template: self.template.name().to_string(),
            context: Value::Object(self.context),
        });
        response
    }
}

// ============================================================================
// Layout
// ============================================================================

fn layout(title: &str, user: Option<&User>, body: &str) -> String {
    let nav = match user {
        Some(user) => format!(
            r#"<a href="/create/">New post</a>
      <a href="/follow/">Subscriptions</a>
      <a href="/profile/{username}/">{name}</a>
      <a href="/auth/logout/">Log out</a>"#,
            username = urlencoding::encode(&user.username),
            name = escape_html(&user.display_name()),
        ),
        None => r#"<a href="/auth/login/">Log in</a>
      <a href="/auth/signup/">Sign up</a>"#
            .to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
</head>
<body>
  <header>
    <nav>
      <a href="/"><strong>Yatube</strong></a>
      <a href="/about/author/">About the author</a>
      <a href="/about/tech/">Technologies</a>
      {nav}
    </nav>
  </header>
  <main class="container">
{body}
  </main>
  <footer><p>&copy; Yatube</p></footer>
</body>
</html>"#,
        title = escape_html(title),
        nav = nav,
        body = body,
    )
}

fn post_card(view: &PostView) -> String {
    let post = &view.post;
    let mut out = String::from(r#"<article class="post">"#);
    out.push_str(&format!(
        r#"<ul><li>Author: <a href="/profile/{}/">{}</a></li><li>Published: {}</li></ul>"#,
        urlencoding::encode(&view.author.username),
        escape_html(&view.author.display_name),
        post.pub_date.format("%d %b %Y"),
    ));
    if let Some(image) = &post.image {
        out.push_str(&format!(
            r#"<img class="card-img" src="/media/{}" alt="">"#,
            escape_attr(image)
        ));
    }
    out.push_str(&format!("<p>{}</p>", escape_html(&post.text)));
    out.push_str(&format!(
        r#"<a href="/posts/{}/">details</a>"#,
        post.id
    ));
    if let Some(group) = &view.group {
        out.push_str(&format!(
            r#" <a href="/group/{}/">all posts of the group {}</a>"#,
            urlencoding::encode(&group.slug),
            escape_html(&group.title)
        ));
    }
    out.push_str("</article>");
    out
}

fn paginator_nav(page: &Page<PostView>) -> String {
    if page.num_pages <= 1 {
        return String::new();
    }
    let mut out = String::from(r#"<nav class="pagination">"#);
    if let Some(prev) = page.previous_page_number() {
        out.push_str(r#"<a href="?page=1">&laquo; first</a> "#);
        out.push_str(&format!(r#"<a href="?page={}">previous</a> "#, prev));
    }
    out.push_str(&format!(
        "<span>Page {} of {}</span>",
        page.number, page.num_pages
    ));
    if let Some(next) = page.next_page_number() {
        out.push_str(&format!(r#" <a href="?page={}">next</a>"#, next));
        out.push_str(&format!(
            r#" <a href="?page={}">last &raquo;</a>"#,
            page.num_pages
        ));
    }
    out.push_str("</nav>");
    out
}

/// Post list with pagination links
pub fn post_list(page: &Page<PostView>) -> String {
    let mut out = String::from(r#"<section class="posts">"#);
    for (i, view) in page.iter().enumerate() {
        if i > 0 {
            out.push_str("<hr>");
        }
        out.push_str(&post_card(view));
    }
    out.push_str("</section>");
    out.push_str(&paginator_nav(page));
    out
}

// ============================================================================
// Posts
// ============================================================================

/// Index page around an already rendered (possibly cached) post list
pub fn index(user: Option<&User>, post_list_html: &str) -> String {
    let body = format!("<h1>Latest updates on the site</h1>\n{}", post_list_html);
    layout("Yatube home page", user, &body)
}

pub fn group_list(user: Option<&User>, group: &Group, page: &Page<PostView>) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n{}",
        escape_html(&group.title),
        escape_html(&group.description),
        post_list(page)
    );
    layout(&format!("Posts of the group {}", group.title), user, &body)
}

pub fn profile(
    user: Option<&User>,
    author: &User,
    page: &Page<PostView>,
    following: bool,
) -> String {
    let mut body = format!(
        "<h1>All posts of user {}</h1>\n<h3>Total posts: {}</h3>\n",
        escape_html(&author.display_name()),
        page.count
    );
    if user.is_some_and(|u| u.id != author.id) {
        let (action, label) = if following {
            ("unfollow", "Unsubscribe")
        } else {
            ("follow", "Subscribe")
        };
        body.push_str(&format!(
            r#"<a class="btn" href="/profile/{}/{}/">{}</a>"#,
            urlencoding::encode(&author.username),
            action,
            label
        ));
    }
    body.push_str(&post_list(page));
    layout(&format!("Profile of {}", author.display_name()), user, &body)
}

pub fn post_detail(
    user: Option<&User>,
    post: &PostView,
    author_posts: usize,
    comments: &[CommentView],
    form: &Form,
) -> String {
    let preview: String = post.post.to_string();
    let mut body = String::from(r#"<div class="row"><aside>"#);
    body.push_str(&format!(
        "<ul><li>Published: {}</li>",
        post.post.pub_date.format("%d %b %Y")
    ));
    if let Some(group) = &post.group {
        body.push_str(&format!(
            r#"<li>Group: <a href="/group/{}/">{}</a></li>"#,
            urlencoding::encode(&group.slug),
            escape_html(&group.title)
        ));
    }
    body.push_str(&format!(
        r#"<li>Author: <a href="/profile/{}/">{}</a></li><li>Total posts by the author: {}</li></ul></aside>"#,
        urlencoding::encode(&post.author.username),
        escape_html(&post.author.display_name),
        author_posts
    ));

    body.push_str("<article>");
    if let Some(image) = &post.post.image {
        body.push_str(&format!(
            r#"<img class="card-img" src="/media/{}" alt="">"#,
            escape_attr(image)
        ));
    }
    body.push_str(&format!("<p>{}</p>", escape_html(&post.post.text)));
    if user.is_some_and(|u| u.id == post.post.author_id) {
        body.push_str(&format!(
            r#"<a class="btn" href="/posts/{}/edit/">edit post</a>"#,
            post.post.id
        ));
    }

    if user.is_some() {
        body.push_str(&format!(
            r#"<div class="card"><h5>Add a comment:</h5><form method="post" action="/posts/{}/comment/">{}<button type="submit">Send</button></form></div>"#,
            post.post.id,
            form.as_html()
        ));
    }
    for comment in comments {
        body.push_str(&format!(
            r#"<div class="comment"><h5><a href="/profile/{}/">{}</a></h5><p>{}</p></div>"#,
            urlencoding::encode(&comment.author.username),
            escape_html(&comment.author.display_name),
            escape_html(&comment.comment.text)
        ));
    }
    body.push_str("</article></div>");

    layout(&format!("Post {}", preview), user, &body)
}

pub fn create_post(user: Option<&User>, form: &Form, edit_post_id: Option<i64>) -> String {
    let (title, action, button) = match edit_post_id {
        Some(id) => ("Edit post", format!("/posts/{}/edit/", id), "Save"),
        None => ("New post", "/create/".to_string(), "Add"),
    };
    let body = format!(
        r#"<div class="card"><h2>{title}</h2><form method="post" enctype="multipart/form-data" action="{action}">{fields}<button type="submit">{button}</button></form></div>"#,
        fields = form.as_html(),
    );
    layout(title, user, &body)
}

pub fn follow(user: Option<&User>, page: &Page<PostView>) -> String {
    let body = format!(
        "<h1>Posts of the authors you follow</h1>\n{}",
        post_list(page)
    );
    layout("Subscriptions", user, &body)
}

// ============================================================================
// About
// ============================================================================

pub fn about_author(user: Option<&User>) -> String {
    layout(
        "About the author",
        user,
        "<h1>About the author</h1>\n<p>Yatube is written and maintained by its contributors.</p>",
    )
}

pub fn about_tech(user: Option<&User>) -> String {
    layout(
        "Technologies",
        user,
        "<h1>Technologies</h1>\n<p>Rust, axum, SQLite.</p>",
    )
}

// ============================================================================
// Users
// ============================================================================

pub fn signup(user: Option<&User>, form: &Form) -> String {
    let body = format!(
        r#"<div class="card"><h2>Sign up</h2><form method="post" action="/auth/signup/">{}<button type="submit">Sign up</button></form></div>"#,
        form.as_html()
    );
    layout("Sign up", user, &body)
}

pub fn login(user: Option<&User>, form: &Form, next: Option<&str>) -> String {
    let action = match next {
        Some(next) => format!("/auth/login/?next={}", urlencoding::encode(next)),
        None => "/auth/login/".to_string(),
    };
    let body = format!(
        r#"<div class="card"><h2>Log in</h2><form method="post" action="{}">{}<button type="submit">Log in</button></form></div>"#,
        escape_attr(&action),
        form.as_html()
    );
    layout("Log in", user, &body)
}

pub fn logged_out() -> String {
    layout(
        "Logged out",
        None,
        r#"<div class="card"><h2>You have been logged out</h2><a href="/auth/login/">Log in again</a></div>"#,
    )
}

// ============================================================================
// Errors
// ============================================================================

pub fn not_found(user: Option<&User>, what: &str) -> String {
    let body = format!(
        "<h1>Error 404</h1>\n<p>Not found: {}</p>\n<a href=\"/\">Go to the home page</a>",
        escape_html(what)
    );
    layout("Page not found", user, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_exposes_template_and_context() {
        let mut context = Map::new();
        context.insert("title".to_string(), json!("hello"));
        let response =
            TemplateResponse::new(Template::AboutTech, context, about_tech(None)).into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let rendered = response.extensions().get::<RenderedPage>().unwrap();
        assert_eq!(rendered.template, "about/tech.html");
        assert_eq!(rendered.context["title"], "hello");
    }

    #[test]
    fn test_with_status() {
        let response = TemplateResponse::new(Template::NotFound, Map::new(), not_found(None, "/x/"))
            .with_status(StatusCode::NOT_FOUND)
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_user_text_is_escaped() {
        let html = not_found(None, "/<script>/");
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
