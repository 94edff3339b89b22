//! URL descriptors
//!
//! A [`UrlDescriptor`] records, for one route, what each [`Role`] should
//! observe: the status of the first response and the template of the page
//! reached after following redirects. Shared defaults fill any role left
//! unset, so after [`UrlBuilder::build`] every role is resolved.

use axum::http::StatusCode;
use std::collections::BTreeMap;
use std::fmt;

use crate::expect::ContextExpectation;

/// Who is making the request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Anonymous visitor
    Guest,
    /// Logged in, but does not own the resource
    Authorized,
    /// Logged in and owns the resource
    Author,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Guest, Role::Authorized, Role::Author];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Guest => "guest",
            Role::Authorized => "authorized",
            Role::Author => "author",
        };
        write!(f, "{}", name)
    }
}

/// What one role should observe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleExpectation {
    /// Status of the first response (before any redirect is followed)
    pub status: Option<StatusCode>,
    /// Template of the final response
    pub template: Option<String>,
}

/// A submitted form value
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

impl FormValue {
    pub fn is_file(&self) -> bool {
        matches!(self, FormValue::File { .. })
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        FormValue::Text(value.to_string())
    }
}

impl From<String> for FormValue {
    fn from(value: String) -> Self {
        FormValue::Text(value)
    }
}

/// Form payload; requests with a non-empty payload are sent as POST
pub type PostData = BTreeMap<String, FormValue>;

/// Everything each role should observe for one route
#[derive(Debug, Clone)]
pub struct UrlDescriptor {
    pub url: String,
    pub guest: RoleExpectation,
    pub authorized: RoleExpectation,
    pub author: RoleExpectation,
    pub post_data: PostData,
    pub context: Vec<ContextExpectation>,
    pub description: String,
}

impl UrlDescriptor {
    pub fn builder(url: impl Into<String>) -> UrlBuilder {
        UrlBuilder::new(url)
    }

    pub fn expected(&self, role: Role) -> &RoleExpectation {
        match role {
            Role::Guest => &self.guest,
            Role::Authorized => &self.authorized,
            Role::Author => &self.author,
        }
    }

    pub fn is_post(&self) -> bool {
        !self.post_data.is_empty()
    }
}

impl fmt::Display for UrlDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.description.is_empty() {
            self.url.as_str()
        } else {
            self.description.as_str()
        };
        writeln!(f, "{} - {}", title, self.url)?;
        for role in Role::ALL {
            let expected = self.expected(role);
            if expected.status.is_none() && expected.template.is_none() {
                continue;
            }
            write!(f, "  {}:", role)?;
            if let Some(status) = expected.status {
                write!(f, " status {}", status.as_u16())?;
            }
            if let Some(template) = &expected.template {
                write!(f, " template {}", template)?;
            }
            writeln!(f)?;
        }
        if !self.post_data.is_empty() {
            let fields: Vec<String> = self
                .post_data
                .iter()
                .map(|(name, value)| match value {
                    FormValue::Text(text) => format!("{}={:?}", name, text),
                    FormValue::File { file_name, bytes, .. } => {
                        format!("{}=<{}, {} bytes>", name, file_name, bytes.len())
                    }
                })
                .collect();
            writeln!(f, "  post: {}", fields.join(", "))?;
        }
        for expectation in &self.context {
            writeln!(f, "  context: {}", expectation)?;
        }
        Ok(())
    }
}

/// Builder for [`UrlDescriptor`]
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    url: String,
    default: RoleExpectation,
    overrides: BTreeMap<Role, RoleExpectation>,
    post_data: PostData,
    context: Vec<ContextExpectation>,
    description: String,
}

impl UrlBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            default: RoleExpectation::default(),
            overrides: BTreeMap::new(),
            post_data: PostData::new(),
            context: Vec::new(),
            description: String::new(),
        }
    }

    /// Status for every role without its own
    pub fn default_status(mut self, status: StatusCode) -> Self {
        self.default.status = Some(status);
        self
    }

    /// Template for every role without its own
    pub fn default_template(mut self, template: impl Into<String>) -> Self {
        self.default.template = Some(template.into());
        self
    }

    pub fn status(mut self, role: Role, status: StatusCode) -> Self {
        self.overrides.entry(role).or_default().status = Some(status);
        self
    }

    pub fn template(mut self, role: Role, template: impl Into<String>) -> Self {
        self.overrides.entry(role).or_default().template = Some(template.into());
        self
    }

    /// Status and template for one role
    pub fn role(self, role: Role, status: StatusCode, template: impl Into<String>) -> Self {
        self.status(role, status).template(role, template)
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<FormValue>) -> Self {
        self.post_data.insert(name.into(), value.into());
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        self.post_data.insert(
            name.into(),
            FormValue::File {
                file_name: file_name.into(),
                content_type: content_type.into(),
                bytes: bytes.into(),
            },
        );
        self
    }

    /// Append context expectations, in order
    pub fn context(mut self, expectations: impl IntoIterator<Item = ContextExpectation>) -> Self {
        self.context.extend(expectations);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn build(self) -> UrlDescriptor {
        let resolve = |role: Role| {
            let own = self.overrides.get(&role).cloned().unwrap_or_default();
            RoleExpectation {
                status: own.status.or(self.default.status),
                template: own.template.or_else(|| self.default.template.clone()),
            }
        };

        UrlDescriptor {
            guest: resolve(Role::Guest),
            authorized: resolve(Role::Authorized),
            author: resolve(Role::Author),
            url: self.url,
            post_data: self.post_data,
            context: self.context,
            description: self.description,
        }
    }
}
