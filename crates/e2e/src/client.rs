//! In-process HTTP client
//!
//! Drives the router directly through `tower::ServiceExt::oneshot`, keeps
//! the session cookie between requests, and exposes the template name and
//! context each page rendered.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use axum_extra::extract::cookie::Cookie;
use bytes::Bytes;
use rand::{distributions::Alphanumeric, Rng};
use serde_json::{Map, Value};
use tower::ServiceExt;
use tracing::debug;
use yatube_web::{auth::SESSION_COOKIE, RenderedPage};

use crate::error::{E2eError, E2eResult};
use crate::url::{FormValue, PostData};

/// Redirect hops followed before giving up
pub const MAX_REDIRECTS: usize = 10;

/// A response as seen by a test
#[derive(Debug, Clone)]
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    /// Template the page rendered, if it rendered one
    pub template: Option<String>,
    pub context: Map<String, Value>,
    pub body: Bytes,
    /// `(url, status)` of every redirect followed to reach this response
    pub redirect_chain: Vec<(String, StatusCode)>,
}

impl TestResponse {
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.location.is_some()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn context_value(&self, name: &str) -> Option<&Value> {
        self.context.get(name)
    }

    /// Status of the first response in the chain
    pub fn first_status(&self) -> StatusCode {
        self.redirect_chain
            .first()
            .map(|(_, status)| *status)
            .unwrap_or(self.status)
    }

    async fn from_response(response: Response) -> E2eResult<Self> {
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let page = response.extensions().get::<RenderedPage>().cloned();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| E2eError::Request {
                method: String::new(),
                url: String::new(),
                reason: format!("reading body: {}", e),
            })?;

        let (template, context) = match page {
            Some(page) => {
                let context = match page.context {
                    Value::Object(map) => map,
                    _ => Map::new(),
                };
                (Some(page.template), context)
            }
            None => (None, Map::new()),
        };

        Ok(Self {
            status,
            location,
            template,
            context,
            body,
            redirect_chain: Vec::new(),
        })
    }
}

/// Client bound to one router and, optionally, one session
#[derive(Clone)]
pub struct TestClient {
    router: Router,
    session: Option<String>,
}

impl TestClient {
    /// Anonymous client
    pub fn new(router: Router) -> Self {
        Self {
            router,
            session: None,
        }
    }

    /// Client already logged in with a session token
    pub fn with_session(router: Router, token: impl Into<String>) -> Self {
        Self {
            router,
            session: Some(token.into()),
        }
    }

    pub fn session(&self) -> Option<&str> {
        self.session.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub async fn get(&mut self, url: &str) -> E2eResult<TestResponse> {
        self.send(Method::GET, url, None).await
    }

    pub async fn post(&mut self, url: &str, data: &PostData) -> E2eResult<TestResponse> {
        self.send(Method::POST, url, Some(data)).await
    }

    /// GET and follow redirects
    pub async fn get_follow(&mut self, url: &str) -> E2eResult<TestResponse> {
        let first = self.get(url).await?;
        self.follow(url, first).await
    }

    /// POST and follow redirects
    pub async fn post_follow(&mut self, url: &str, data: &PostData) -> E2eResult<TestResponse> {
        let first = self.post(url, data).await?;
        self.follow(url, first).await
    }

    /// Follow redirects from `response` with GET requests
    pub async fn follow(&mut self, url: &str, mut response: TestResponse) -> E2eResult<TestResponse> {
        let mut chain = Vec::new();
        let mut current = url.to_string();

        while response.is_redirect() {
            if chain.len() >= MAX_REDIRECTS {
                return Err(E2eError::RedirectLoop(url.to_string()));
            }
            let next = match response.location.take() {
                Some(location) => location,
                None => break,
            };
            chain.push((current, response.status));
            debug!("Following redirect to {}", next);
            response = self.get(&next).await?;
            current = next;
        }

        response.redirect_chain = chain;
        Ok(response)
    }

    async fn send(
        &mut self,
        method: Method,
        url: &str,
        data: Option<&PostData>,
    ) -> E2eResult<TestResponse> {
        let mut builder = Request::builder().method(method.clone()).uri(url);
        if let Some(token) = &self.session {
            let cookie = Cookie::new(SESSION_COOKIE, token.as_str());
            builder = builder.header(header::COOKIE, cookie.to_string());
        }

        let body = match data {
            Some(data) if data.values().any(FormValue::is_file) => {
                let boundary = boundary();
                builder = builder.header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", boundary),
                );
                Body::from(multipart_body(data, &boundary))
            }
            Some(data) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(urlencoded_body(data))
            }
            None => Body::empty(),
        };

        let request = builder.body(body).map_err(|e| E2eError::Request {
            method: method.to_string(),
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let response = match self.router.clone().oneshot(request).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        self.track_session(&response);

        debug!("{} {} -> {}", method, url, response.status());
        TestResponse::from_response(response)
            .await
            .map_err(|e| match e {
                E2eError::Request { reason, .. } => E2eError::Request {
                    method: method.to_string(),
                    url: url.to_string(),
                    reason,
                },
                other => other,
            })
    }

    /// Pick up session cookies set or removed by the response
    fn track_session(&mut self, response: &Response) {
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| Cookie::parse(value).ok())
            .filter(|cookie| cookie.name() == SESSION_COOKIE);

        for cookie in cookies {
            self.session = if is_removal(&cookie) {
                None
            } else {
                Some(cookie.value().to_string())
            };
        }
    }
}

/// A cookie the server sent to delete the client's copy
fn is_removal(cookie: &Cookie<'_>) -> bool {
    cookie.value().is_empty()
        || cookie
            .max_age()
            .is_some_and(|age| age.is_zero() || age.is_negative())
}

fn boundary() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("yatube-{}", suffix)
}

fn urlencoded_body(data: &PostData) -> String {
    data.iter()
        .filter_map(|(name, value)| match value {
            FormValue::Text(text) => Some(format!(
                "{}={}",
                urlencoding::encode(name),
                urlencoding::encode(text)
            )),
            FormValue::File { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn multipart_body(data: &PostData, boundary: &str) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in data {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match value {
            FormValue::Text(text) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(text.as_bytes());
            }
            FormValue::File {
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                        name, file_name, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> PostData {
        let mut data = PostData::new();
        data.insert("text".to_string(), FormValue::from("hello world & more"));
        data.insert("group".to_string(), FormValue::from("1"));
        data
    }

    #[test]
    fn test_urlencoded_body() {
        assert_eq!(urlencoded_body(&data()), "group=1&text=hello%20world%20%26%20more");
    }

    #[test]
    fn test_multipart_body_has_every_part() {
        let mut data = data();
        data.insert(
            "image".to_string(),
            FormValue::File {
                file_name: "small.gif".to_string(),
                content_type: "image/gif".to_string(),
                bytes: b"GIF89a".to_vec(),
            },
        );
        let body = String::from_utf8(multipart_body(&data, "XYZ")).unwrap();
        assert!(body.starts_with("--XYZ\r\n"));
        assert!(body.ends_with("--XYZ--\r\n"));
        assert!(body.contains("name=\"image\"; filename=\"small.gif\"\r\nContent-Type: image/gif\r\n\r\nGIF89a\r\n"));
        assert!(body.contains("name=\"text\"\r\n\r\nhello world & more\r\n"));
        assert_eq!(body.matches("--XYZ\r\n").count(), 3);
    }

    #[test]
    fn test_boundary_is_random() {
        assert_ne!(boundary(), boundary());
    }

    #[test]
    fn test_track_session_sets_and_clears() {
        let mut client = TestClient::new(Router::new());

        let response = Response::builder()
            .header(header::SET_COOKIE, "sessionid=abc123; Path=/; HttpOnly")
            .body(Body::empty())
            .unwrap();
        client.track_session(&response);
        assert_eq!(client.session(), Some("abc123"));

        let response = Response::builder()
            .header(header::SET_COOKIE, "other=1; Path=/")
            .body(Body::empty())
            .unwrap();
        client.track_session(&response);
        assert_eq!(client.session(), Some("abc123"));

        let response = Response::builder()
            .header(header::SET_COOKIE, "sessionid=; Path=/; Max-Age=0")
            .body(Body::empty())
            .unwrap();
        client.track_session(&response);
        assert_eq!(client.session(), None);
    }

    #[test]
    fn test_track_session_honours_max_age_removal() {
        let mut client = TestClient::with_session(Router::new(), "abc123");

        let response = Response::builder()
            .header(
                header::SET_COOKIE,
                "sessionid=stale; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            )
            .body(Body::empty())
            .unwrap();
        client.track_session(&response);
        assert_eq!(client.session(), None);
    }

    #[test]
    fn test_track_session_ignores_malformed() {
        let mut client = TestClient::new(Router::new());

        let response = Response::builder()
            .header(header::SET_COOKIE, "not a cookie")
            .header(header::SET_COOKIE, "sessionid=tok; HttpOnly")
            .body(Body::empty())
            .unwrap();
        client.track_session(&response);
        assert_eq!(client.session(), Some("tok"));
    }

    #[test]
    fn test_session_cookie_header_round_trips() {
        let cookie = Cookie::new(SESSION_COOKIE, "abc123");
        let parsed = Cookie::parse(cookie.to_string()).unwrap();
        assert_eq!(parsed.name(), SESSION_COOKIE);
        assert_eq!(parsed.value(), "abc123");
    }
}
