//! Form field kinds shared by the web forms and the test expectations

use serde::{Deserialize, Serialize};

/// Runtime kind of a form field
///
/// Kinds form a small hierarchy: every kind is a [`FieldKind::Field`],
/// `Image` is a `File`, `ModelChoice` is a `Choice`, `Email` and `Slug`
/// are `Char`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Field,
    Char,
    Email,
    Slug,
    Choice,
    ModelChoice,
    File,
    Image,
    Boolean,
}

impl FieldKind {
    /// Direct parent in the kind hierarchy
    pub fn parent(self) -> Option<FieldKind> {
        match self {
            FieldKind::Field => None,
            FieldKind::Char | FieldKind::Choice | FieldKind::File | FieldKind::Boolean => {
                Some(FieldKind::Field)
            }
            FieldKind::Email | FieldKind::Slug => Some(FieldKind::Char),
            FieldKind::ModelChoice => Some(FieldKind::Choice),
            FieldKind::Image => Some(FieldKind::File),
        }
    }

    /// True if `self` is `other` or a subtype of it
    pub fn is_a(self, other: FieldKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == other {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Field => "field",
            Self::Char => "char",
            Self::Email => "email",
            Self::Slug => "slug",
            Self::Choice => "choice",
            Self::ModelChoice => "model_choice",
            Self::File => "file",
            Self::Image => "image",
            Self::Boolean => "boolean",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for FieldKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "field" => Ok(Self::Field),
            "char" => Ok(Self::Char),
            "email" => Ok(Self::Email),
            "slug" => Ok(Self::Slug),
            "choice" => Ok(Self::Choice),
            "model_choice" => Ok(Self::ModelChoice),
            "file" => Ok(Self::File),
            "image" => Ok(Self::Image),
            "boolean" => Ok(Self::Boolean),
            _ => Err(format!("unknown field kind: {}", s)),
        }
    }
}
