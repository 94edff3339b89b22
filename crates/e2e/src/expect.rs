//! Context expectations
//!
//! A rendered page exposes its context as a JSON object. Each
//! [`ContextExpectation`] names one entry of that object and a [`Check`]
//! to run against it:
//!
//! | check        | passes when                                                  |
//! |--------------|--------------------------------------------------------------|
//! | `exact`      | the entry equals the literal (a missing entry is `null`)     |
//! | `attributes` | the entry is an object carrying every listed attribute       |
//! | `contains`   | every needle matches at least one element of the sequence    |
//! | `length`     | the sequence has exactly `len` elements                      |
//! | `form`       | the form has every named field with a compatible kind        |
//!
//! A "sequence" is a JSON array or a paginated page (its `object_list`).
//!
//! Expectations can also be loaded from YAML:
//!
//! ```yaml
//! - name: page_obj
//!   kind: length
//!   len: 10
//! - name: form
//!   kind: form
//!   fields:
//!     text: char
//!     image: file
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use yatube_common::FieldKind;

use crate::error::{E2eError, E2eResult};

/// Attribute name -> expected value
///
/// Names may be dotted (`author.username`) to reach into nested objects.
pub type AttributeSet = BTreeMap<String, Value>;

/// Build an [`AttributeSet`] from pairs
pub fn attrs<I, K, V>(pairs: I) -> AttributeSet
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

/// Predicate over one context entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Check {
    Exact { value: Value },
    Attributes { attributes: AttributeSet },
    Contains { needles: Vec<AttributeSet> },
    Length { len: usize },
    Form { fields: BTreeMap<String, FieldKind> },
}

impl Check {
    /// Run the check against an entry, describing the mismatch on failure
    pub fn evaluate(&self, actual: Option<&Value>) -> Result<(), String> {
        match self {
            Check::Exact { value } => {
                let actual = actual.unwrap_or(&Value::Null);
                if actual == value {
                    Ok(())
                } else {
                    Err(format!("expected {}, got {}", value, actual))
                }
            }
            Check::Attributes { attributes } => {
                let actual = actual.ok_or("entry is missing")?;
                match attributes_mismatch(attributes, actual) {
                    None => Ok(()),
                    Some(reason) => Err(reason),
                }
            }
            Check::Contains { needles } => {
                let items = actual
                    .and_then(as_sequence)
                    .ok_or("entry is not a sequence")?;
                for needle in needles {
                    if !items.iter().any(|item| attributes_match(needle, item)) {
                        return Err(format!(
                            "no element matches {} among {} element(s)",
                            Value::from(Map::from_iter(needle.clone())),
                            items.len()
                        ));
                    }
                }
                Ok(())
            }
            Check::Length { len } => {
                let items = actual
                    .and_then(as_sequence)
                    .ok_or("entry is not a sequence")?;
                if items.len() == *len {
                    Ok(())
                } else {
                    Err(format!("expected {} element(s), got {}", len, items.len()))
                }
            }
            Check::Form { fields } => {
                let actual_fields = actual
                    .and_then(|v| v.get("fields"))
                    .and_then(Value::as_object)
                    .ok_or("entry is not a form")?;
                for (name, expected) in fields {
                    let kind = actual_fields
                        .get(name)
                        .and_then(|f| f.get("kind"))
                        .and_then(|k| serde_json::from_value::<FieldKind>(k.clone()).ok())
                        .ok_or_else(|| format!("form has no field '{}'", name))?;
                    if !kind.is_a(*expected) {
                        return Err(format!(
                            "field '{}' is {}, expected {}",
                            name, kind, expected
                        ));
                    }
                }
                Ok(())
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Check::Exact { .. } => "exact",
            Check::Attributes { .. } => "attributes",
            Check::Contains { .. } => "contains",
            Check::Length { .. } => "length",
            Check::Form { .. } => "form",
        }
    }
}

/// One named expectation over a page's context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextExpectation {
    /// Context entry the check runs against
    pub name: String,
    #[serde(flatten)]
    pub check: Check,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl ContextExpectation {
    fn new(name: impl Into<String>, check: Check) -> Self {
        Self {
            name: name.into(),
            check,
            description: String::new(),
        }
    }

    /// Entry equals `value`
    pub fn exact(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, Check::Exact { value: value.into() })
    }

    /// Entry is an object carrying every attribute in `attributes`
    pub fn attributes(name: impl Into<String>, attributes: AttributeSet) -> Self {
        Self::new(name, Check::Attributes { attributes })
    }

    /// Every needle matches some element of the entry's sequence
    ///
    /// Fails when no needles are given.
    pub fn contains(
        name: impl Into<String>,
        needles: impl IntoIterator<Item = AttributeSet>,
    ) -> E2eResult<Self> {
        let expectation = Self::new(
            name,
            Check::Contains {
                needles: needles.into_iter().collect(),
            },
        );
        expectation.validate()?;
        Ok(expectation)
    }

    /// Entry's sequence has exactly `len` elements
    pub fn length(name: impl Into<String>, len: usize) -> Self {
        Self::new(name, Check::Length { len })
    }

    /// Entry is a form with these fields, each of the given kind or a subtype
    pub fn form<I, K>(name: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldKind)>,
        K: Into<String>,
    {
        Self::new(
            name,
            Check::Form {
                fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            },
        )
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Reject expectations that can never be meaningfully checked
    pub fn validate(&self) -> E2eResult<()> {
        if self.name.is_empty() {
            return Err(E2eError::InvalidExpectation(
                "context entry name is empty".to_string(),
            ));
        }
        if let Check::Contains { needles } = &self.check {
            if needles.is_empty() {
                return Err(E2eError::InvalidExpectation(format!(
                    "'{}': containment check needs at least one needle",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Check against a page context
    pub fn evaluate(&self, context: &Map<String, Value>) -> Result<(), String> {
        self.check
            .evaluate(context.get(&self.name))
            .map_err(|reason| format!("context '{}': {}", self.name, reason))
    }

    pub fn matches(&self, context: &Map<String, Value>) -> bool {
        self.evaluate(context).is_ok()
    }

    /// Parse and validate a list of expectations
    pub fn list_from_yaml(yaml: &str) -> E2eResult<Vec<Self>> {
        let list: Vec<Self> = serde_yaml::from_str(yaml)?;
        for expectation in &list {
            expectation.validate()?;
        }
        Ok(list)
    }
}

impl fmt::Display for ContextExpectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let detail = match &self.check {
            Check::Exact { value } => value.to_string(),
            Check::Attributes { attributes } => Value::from(Map::from_iter(attributes.clone())).to_string(),
            Check::Contains { needles } => format!("{} needle(s)", needles.len()),
            Check::Length { len } => len.to_string(),
            Check::Form { fields } => fields
                .iter()
                .map(|(name, kind)| format!("{}: {}", name, kind))
                .collect::<Vec<_>>()
                .join(", "),
        };
        write!(f, "{} [{}] {}", self.name, self.check.kind(), detail)?;
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

/// Elements of an array or of a page's `object_list`
fn as_sequence(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get("object_list").and_then(Value::as_array),
        _ => None,
    }
}

/// Follow a dotted attribute path through nested objects
fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.as_object()?.get(key))
}

fn attributes_mismatch(expected: &AttributeSet, actual: &Value) -> Option<String> {
    if !actual.is_object() {
        return Some(format!("expected an object, got {}", actual));
    }
    for (key, value) in expected {
        match lookup(actual, key) {
            Some(found) if found == value => {}
            Some(found) => return Some(format!("'{}' is {}, expected {}", key, found, value)),
            None => return Some(format!("attribute '{}' is missing", key)),
        }
    }
    None
}

fn attributes_match(expected: &AttributeSet, actual: &Value) -> bool {
    attributes_mismatch(expected, actual).is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn context(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("context must be an object"),
        }
    }

    fn page(items: Vec<Value>) -> Value {
        json!({ "number": 1, "num_pages": 1, "object_list": items })
    }

    #[test]
    fn test_exact_compares_by_value() {
        let ctx = context(json!({ "is_edit": true, "count": 3 }));
        assert!(ContextExpectation::exact("is_edit", true).matches(&ctx));
        assert!(ContextExpectation::exact("count", 3).matches(&ctx));
        assert!(!ContextExpectation::exact("count", 4).matches(&ctx));
    }

    #[test]
    fn test_exact_missing_entry_is_null() {
        let ctx = context(json!({}));
        assert!(ContextExpectation::exact("absent", Value::Null).matches(&ctx));
        assert!(!ContextExpectation::exact("absent", false).matches(&ctx));
    }

    #[test]
    fn test_attributes_ignore_extra_fields() {
        let ctx = context(json!({
            "group": { "id": 1, "title": "Cats", "slug": "cats", "description": "meow" }
        }));
        let expectation =
            ContextExpectation::attributes("group", attrs([("title", "Cats"), ("slug", "cats")]));
        assert!(expectation.matches(&ctx));
    }

    #[test]
    fn test_attributes_missing_attribute_fails() {
        let ctx = context(json!({ "group": { "title": "Cats" } }));
        let expectation = ContextExpectation::attributes("group", attrs([("slug", "cats")]));
        let err = expectation.evaluate(&ctx).unwrap_err();
        assert!(err.contains("'slug' is missing"), "{}", err);
    }

    #[test_case(json!(null) ; "null")]
    #[test_case(json!("Cats") ; "string")]
    #[test_case(json!([{ "title": "Cats" }]) ; "array")]
    fn test_attributes_on_non_object_fails(actual: Value) {
        let ctx = context(json!({ "group": actual }));
        let expectation = ContextExpectation::attributes("group", attrs([("title", "Cats")]));
        assert!(!expectation.matches(&ctx));
    }

    #[test]
    fn test_attributes_follow_dotted_paths() {
        let ctx = context(json!({ "post": { "author": { "username": "leo" } } }));
        let expectation =
            ContextExpectation::attributes("post", attrs([("author.username", "leo")]));
        assert!(expectation.matches(&ctx));
        let wrong = ContextExpectation::attributes("post", attrs([("author.username", "tolstoy")]));
        assert!(!wrong.matches(&ctx));
    }

    #[test]
    fn test_contains_needs_every_needle() {
        let ctx = context(json!({
            "page_obj": page(vec![json!({ "text": "a" }), json!({ "text": "b" })])
        }));
        let both = ContextExpectation::contains(
            "page_obj",
            [attrs([("text", "a")]), attrs([("text", "b")])],
        )
        .unwrap();
        assert!(both.matches(&ctx));

        let missing = ContextExpectation::contains(
            "page_obj",
            [attrs([("text", "a")]), attrs([("text", "c")])],
        )
        .unwrap();
        assert!(!missing.matches(&ctx));
    }

    #[test]
    fn test_contains_allows_needles_to_share_an_element() {
        let ctx = context(json!({ "posts": [{ "text": "a", "group_id": 1 }] }));
        let expectation = ContextExpectation::contains(
            "posts",
            [attrs([("text", "a")]), attrs([("group_id", 1)])],
        )
        .unwrap();
        assert!(expectation.matches(&ctx));
    }

    #[test]
    fn test_contains_without_needles_is_rejected() {
        let result = ContextExpectation::contains("page_obj", Vec::<AttributeSet>::new());
        assert!(matches!(result, Err(E2eError::InvalidExpectation(_))));
    }

    #[test_case(2, true ; "exact length")]
    #[test_case(1, false ; "one short")]
    #[test_case(3, false ; "one over")]
    fn test_length_is_exact(len: usize, expected: bool) {
        let ctx = context(json!({ "page_obj": page(vec![json!(1), json!(2)]) }));
        assert_eq!(ContextExpectation::length("page_obj", len).matches(&ctx), expected);
    }

    #[test]
    fn test_length_on_non_sequence_fails() {
        let ctx = context(json!({ "page_obj": { "number": 1 } }));
        assert!(!ContextExpectation::length("page_obj", 0).matches(&ctx));
        assert!(!ContextExpectation::length("missing", 0).matches(&ctx));
    }

    #[test]
    fn test_form_matches_subtypes() {
        let ctx = context(json!({
            "form": {
                "fields": {
                    "text": { "kind": "char" },
                    "group": { "kind": "model_choice" },
                    "image": { "kind": "image" }
                }
            }
        }));
        let expectation = ContextExpectation::form(
            "form",
            [
                ("text", FieldKind::Char),
                ("group", FieldKind::Choice),
                ("image", FieldKind::File),
            ],
        );
        assert!(expectation.matches(&ctx));

        let too_specific = ContextExpectation::form("form", [("text", FieldKind::Email)]);
        assert!(!too_specific.matches(&ctx));

        let absent = ContextExpectation::form("form", [("title", FieldKind::Char)]);
        assert!(!absent.matches(&ctx));
    }

    #[test]
    fn test_list_from_yaml() {
        let yaml = r#"
- name: page_obj
  kind: length
  len: 10
- name: group
  kind: attributes
  attributes:
    slug: cats
- name: form
  kind: form
  fields:
    text: char
    image: file
  description: post form
"#;
        let list = ContextExpectation::list_from_yaml(yaml).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], ContextExpectation::length("page_obj", 10));
        assert_eq!(list[2].description, "post form");
        assert!(matches!(list[2].check, Check::Form { .. }));
    }

    #[test]
    fn test_list_from_yaml_rejects_empty_needles() {
        let yaml = "- name: page_obj\n  kind: contains\n  needles: []\n";
        assert!(ContextExpectation::list_from_yaml(yaml).is_err());
    }

    #[test]
    fn test_display_names_kind() {
        let expectation = ContextExpectation::length("page_obj", 10).with_description("first page");
        assert_eq!(expectation.to_string(), "page_obj [length] 10 (first page)");
    }
}
