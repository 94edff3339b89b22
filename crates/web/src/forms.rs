//! HTML forms: field schemas, submission parsing and validation
//!
//! A [`Form`] holds a static field schema plus the submitted (or initial)
//! values and per-field errors. It renders itself to HTML and serializes
//! into page context as
//! `{"fields": {name: {"kind", "label", "required", ...}}, "errors", "data", "is_bound"}`.

use crate::error::WebError;
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form as UrlEncoded,
};
use bytes::Bytes;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use yatube_common::{FieldKind, Group, GroupId, NewUser, PostView};

/// Key for errors that do not belong to a single field
pub const NON_FIELD_ERRORS: &str = "__all__";

const REQUIRED: &str = "This field is required.";
const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Static description of one form field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub help_text: &'static str,
}

/// A file field from a multipart submission
#[derive(Debug, Clone, PartialEq)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// Parsed body of a form POST (urlencoded or multipart)
#[derive(Debug, Clone, Default)]
pub struct FormSubmission {
    pub fields: BTreeMap<String, String>,
    pub files: BTreeMap<String, UploadedFile>,
}

impl FormSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormSubmission
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("multipart/form-data"))
            .unwrap_or(false);

        if !is_multipart {
            let UrlEncoded(pairs) = UrlEncoded::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|e| WebError::BadRequest(e.to_string()))?;
            return Ok(Self {
                fields: pairs.into_iter().collect(),
                files: BTreeMap::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| WebError::BadRequest(e.to_string()))?;
        let mut submission = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| WebError::BadRequest(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| WebError::BadRequest(e.to_string()))?;
                    // An untouched file input still submits an empty part
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    submission.files.insert(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            bytes,
                        },
                    );
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| WebError::BadRequest(e.to_string()))?;
                    submission.fields.insert(name, text);
                }
            }
        }

        Ok(submission)
    }
}

// ============================================================================
// Generic form
// ============================================================================

#[derive(Debug, Clone)]
pub struct Form {
    fields: &'static [FieldDef],
    data: BTreeMap<String, String>,
    errors: BTreeMap<String, Vec<String>>,
    choices: BTreeMap<&'static str, Vec<(String, String)>>,
    bound: bool,
}

impl Form {
    /// Empty form
    pub fn unbound(fields: &'static [FieldDef]) -> Self {
        Self {
            fields,
            data: BTreeMap::new(),
            errors: BTreeMap::new(),
            choices: BTreeMap::new(),
            bound: false,
        }
    }

    /// Unbound form pre-filled with initial values
    pub fn with_initial(fields: &'static [FieldDef], initial: BTreeMap<String, String>) -> Self {
        Self {
            data: initial,
            ..Self::unbound(fields)
        }
    }

    /// Form bound to submitted values
    pub fn bind(fields: &'static [FieldDef], submission: &FormSubmission) -> Self {
        let data = fields
            .iter()
            .filter_map(|f| {
                submission
                    .field(f.name)
                    .map(|v| (f.name.to_string(), v.to_string()))
            })
            .collect();
        Self {
            data,
            bound: true,
            ..Self::unbound(fields)
        }
    }

    /// Options offered by a choice field, as `(value, label)` pairs
    pub fn set_choices(&mut self, field: &'static str, choices: Vec<(String, String)>) {
        self.choices.insert(field, choices);
    }

    pub fn fields(&self) -> &'static [FieldDef] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    /// Trimmed value, `None` if missing or blank
    pub fn cleaned(&self, name: &str) -> Option<&str> {
        self.value(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_valid(&self) -> bool {
        self.bound && self.errors.is_empty()
    }

    /// Record "required" errors for every blank required field
    fn check_required(&mut self, submission: &FormSubmission) {
        for def in self.fields {
            if !def.required {
                continue;
            }
            let present = if def.kind.is_a(FieldKind::File) {
                submission.file(def.name).is_some()
            } else {
                self.cleaned(def.name).is_some()
            };
            if !present {
                self.add_error(def.name, REQUIRED);
            }
        }
    }

    /// Context representation of the form
    pub fn to_context(&self) -> Value {
        let mut fields = Map::new();
        for def in self.fields {
            let mut field = json!({
                "kind": def.kind,
                "label": def.label,
                "required": def.required,
                "help_text": def.help_text,
                "value": self.value(def.name),
            });
            if let Some(choices) = self.choices.get(def.name) {
                field["choices"] = json!(choices);
            }
            fields.insert(def.name.to_string(), field);
        }
        json!({
            "fields": fields,
            "errors": self.errors,
            "data": self.data,
            "is_bound": self.bound,
        })
    }

    /// Render the form's inputs (without the surrounding `<form>` tag)
    pub fn as_html(&self) -> String {
        let mut out = String::new();

        if let Some(errors) = self.errors.get(NON_FIELD_ERRORS) {
            out.push_str(&error_list(errors));
        }

        for def in self.fields {
            let value = self.value(def.name).unwrap_or_default();
            let required = if def.required { " required" } else { "" };
            let input = match def.kind {
                FieldKind::Image | FieldKind::File => format!(
                    r#"<input type="file" name="{name}" id="id_{name}"{accept}>"#,
                    name = def.name,
                    accept = if def.kind == FieldKind::Image {
                        r#" accept="image/*""#
                    } else {
                        ""
                    },
                ),
                FieldKind::ModelChoice | FieldKind::Choice => {
                    let mut options = String::from(r#"<option value="">---------</option>"#);
                    for (choice, label) in self.choices.get(def.name).into_iter().flatten() {
                        let selected = if choice == value { " selected" } else { "" };
                        options.push_str(&format!(
                            r#"<option value="{}"{}>{}</option>"#,
                            escape_attr(choice),
                            selected,
                            escape_html(label)
                        ));
                    }
                    format!(
                        r#"<select name="{name}" id="id_{name}"{required}>{options}</select>"#,
                        name = def.name,
                    )
                }
                _ if def.name == "text" => format!(
                    r#"<textarea name="{name}" id="id_{name}" rows="10"{required}>{value}</textarea>"#,
                    name = def.name,
                    value = escape_html(value),
                ),
                _ => format!(
                    r#"<input type="{ty}" name="{name}" id="id_{name}" value="{value}"{required}>"#,
                    ty = input_type(def),
                    name = def.name,
                    value = if input_type(def) == "password" {
                        String::new()
                    } else {
                        escape_attr(value)
                    },
                ),
            };

            out.push_str(&format!(
                r#"<div class="form-group"><label for="id_{}">{}</label>{}"#,
                def.name,
                escape_html(def.label),
                input
            ));
            if !def.help_text.is_empty() {
                out.push_str(&format!(
                    r#"<small class="form-text text-muted">{}</small>"#,
                    escape_html(def.help_text)
                ));
            }
            if let Some(errors) = self.errors.get(def.name) {
                out.push_str(&error_list(errors));
            }
            out.push_str("</div>");
        }
        out
    }
}

fn input_type(def: &FieldDef) -> &'static str {
    match def.kind {
        FieldKind::Email => "email",
        FieldKind::Boolean => "checkbox",
        _ if def.name.starts_with("password") => "password",
        _ => "text",
    }
}

fn error_list(errors: &[String]) -> String {
    let items: String = errors
        .iter()
        .map(|e| format!("<li>{}</li>", escape_html(e)))
        .collect();
    format!(r#"<ul class="errorlist">{}</ul>"#, items)
}

pub(crate) fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;").replace('\'', "&#x27;")
}

// ============================================================================
// Post form
// ============================================================================

/// Cleaned post submission
#[derive(Debug, Clone)]
pub struct PostInput {
    pub text: String,
    pub group_id: Option<GroupId>,
    pub image: Option<UploadedFile>,
}

pub struct PostForm;

impl PostForm {
    pub const FIELDS: &'static [FieldDef] = &[
        FieldDef {
            name: "text",
            label: "Text",
            kind: FieldKind::Char,
            required: true,
            help_text: "Text of the new post",
        },
        FieldDef {
            name: "group",
            label: "Group",
            kind: FieldKind::ModelChoice,
            required: false,
            help_text: "Group the post will belong to",
        },
        FieldDef {
            name: "image",
            label: "Image",
            kind: FieldKind::Image,
            required: false,
            help_text: "Picture attached to the post",
        },
    ];

    pub fn empty(groups: &[Group]) -> Form {
        let mut form = Form::unbound(Self::FIELDS);
        form.set_choices("group", group_choices(groups));
        form
    }

    /// Edit form pre-filled from an existing post
    pub fn for_post(groups: &[Group], post: &PostView) -> Form {
        let mut initial = BTreeMap::new();
        initial.insert("text".to_string(), post.post.text.clone());
        if let Some(group_id) = post.post.group_id {
            initial.insert("group".to_string(), group_id.to_string());
        }
        let mut form = Form::with_initial(Self::FIELDS, initial);
        form.set_choices("group", group_choices(groups));
        form
    }

    /// Validate a submission; on failure the bound form carries the errors
    pub fn validate(groups: &[Group], submission: &FormSubmission) -> Result<PostInput, Form> {
        let mut form = Form::bind(Self::FIELDS, submission);
        form.set_choices("group", group_choices(groups));
        form.check_required(submission);

        let group_id = match form.cleaned("group") {
            None => None,
            Some(raw) => match raw.parse::<GroupId>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    form.add_error("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = submission.file("image").cloned();
        if let Some(upload) = &image {
            if image::guess_format(&upload.bytes).is_err() {
                form.add_error("image", INVALID_IMAGE);
            }
        }

        if !form.is_valid() {
            return Err(form);
        }

        Ok(PostInput {
            text: form.cleaned("text").unwrap_or_default().to_string(),
            group_id,
            image,
        })
    }
}

fn group_choices(groups: &[Group]) -> Vec<(String, String)> {
    groups
        .iter()
        .map(|g| (g.id.to_string(), g.title.clone()))
        .collect()
}

// ============================================================================
// Comment form
// ============================================================================

pub struct CommentForm;

impl CommentForm {
    pub const FIELDS: &'static [FieldDef] = &[FieldDef {
        name: "text",
        label: "Comment",
        kind: FieldKind::Char,
        required: true,
        help_text: "Text of the comment",
    }];

    pub fn empty() -> Form {
        Form::unbound(Self::FIELDS)
    }

    pub fn validate(submission: &FormSubmission) -> Result<String, Form> {
        let mut form = Form::bind(Self::FIELDS, submission);
        form.check_required(submission);
        if !form.is_valid() {
            return Err(form);
        }
        Ok(form.cleaned("text").unwrap_or_default().to_string())
    }
}

// ============================================================================
// Auth forms
// ============================================================================

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

pub struct SignupForm;

impl SignupForm {
    pub const FIELDS: &'static [FieldDef] = &[
        FieldDef {
            name: "first_name",
            label: "First name",
            kind: FieldKind::Char,
            required: false,
            help_text: "",
        },
        FieldDef {
            name: "last_name",
            label: "Last name",
            kind: FieldKind::Char,
            required: false,
            help_text: "",
        },
        FieldDef {
            name: "username",
            label: "Username",
            kind: FieldKind::Char,
            required: true,
            help_text: "150 characters or fewer. Letters, digits and @/./+/-/_ only.",
        },
        FieldDef {
            name: "email",
            label: "Email address",
            kind: FieldKind::Email,
            required: false,
            help_text: "",
        },
        FieldDef {
            name: "password1",
            label: "Password",
            kind: FieldKind::Char,
            required: true,
            help_text: "Your password must contain at least 8 characters.",
        },
        FieldDef {
            name: "password2",
            label: "Password confirmation",
            kind: FieldKind::Char,
            required: true,
            help_text: "Enter the same password as before, for verification.",
        },
    ];

    pub fn empty() -> Form {
        Form::unbound(Self::FIELDS)
    }

    /// Validate field formats; username uniqueness is checked by the caller
    pub fn validate(submission: &FormSubmission) -> Result<(NewUser, Form), Form> {
        let mut form = Form::bind(Self::FIELDS, submission);
        form.check_required(submission);

        if let Some(username) = form.cleaned("username").map(str::to_string) {
            if !is_valid_username(&username) {
                form.add_error(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }

        if let Some(email) = form.cleaned("email").map(str::to_string) {
            if !is_valid_email(&email) {
                form.add_error("email", "Enter a valid email address.");
            }
        }

        let password1 = form.value("password1").unwrap_or_default().to_string();
        let password2 = form.value("password2").unwrap_or_default().to_string();
        if !password1.is_empty() && password1.chars().count() < PASSWORD_MIN_LEN {
            form.add_error(
                "password1",
                "This password is too short. It must contain at least 8 characters.",
            );
        }
        if !password2.is_empty() && password1 != password2 {
            form.add_error("password2", "The two password fields didn't match.");
        }

        if !form.is_valid() {
            return Err(form);
        }

        let user = NewUser {
            username: form.cleaned("username").unwrap_or_default().to_string(),
            first_name: form.cleaned("first_name").unwrap_or_default().to_string(),
            last_name: form.cleaned("last_name").unwrap_or_default().to_string(),
            email: form.cleaned("email").unwrap_or_default().to_string(),
            password: password1,
        };
        Ok((user, form))
    }
}

fn is_valid_username(username: &str) -> bool {
    let len = username.chars().count();
    (1..=USERNAME_MAX_LEN).contains(&len)
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub struct LoginForm;

impl LoginForm {
    pub const FIELDS: &'static [FieldDef] = &[
        FieldDef {
            name: "username",
            label: "Username",
            kind: FieldKind::Char,
            required: true,
            help_text: "",
        },
        FieldDef {
            name: "password",
            label: "Password",
            kind: FieldKind::Char,
            required: true,
            help_text: "",
        },
    ];

    pub fn empty() -> Form {
        Form::unbound(Self::FIELDS)
    }

    /// Returns the credentials; checking them is the caller's job
    pub fn validate(submission: &FormSubmission) -> Result<(String, String, Form), Form> {
        let mut form = Form::bind(Self::FIELDS, submission);
        form.check_required(submission);
        if !form.is_valid() {
            return Err(form);
        }
        let username = form.cleaned("username").unwrap_or_default().to_string();
        let password = form.value("password").unwrap_or_default().to_string();
        Ok((username, password, form))
    }
}
