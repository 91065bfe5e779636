//! Placeholder domain types.
//!
//! A document goes through three identity stages:
//! raw [`PlaceholderToken`]s found by the templating engine, the extraction
//! service's [`PlaceholderSpec`]s, and finally the [`CanonicalPlaceholder`]s
//! the user fills in.

use serde::{Deserialize, Deserializer, Serialize};

/// A raw marker found while scanning a document front-to-back.
///
/// Only lives for the duration of binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderToken {
    /// 0-based position in document order.
    pub occurrence_index: usize,
    /// The text enclosed by the delimiters, exactly as written.
    pub raw_tag: String,
}

/// One record of the extraction service's upload response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderSpec {
    /// 1-based occurrence order of the token this name belongs to.
    pub order: u32,

    /// The service-assigned name.
    pub name: String,

    /// Advisory text shown next to the field.
    #[serde(default)]
    pub description: String,
}

/// A fillable field as surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalPlaceholder {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Committed value; empty while unfilled.
    #[serde(default)]
    pub value: String,
}

impl CanonicalPlaceholder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value: String::new(),
        }
    }

    /// Whether the committed value counts as filled (non-blank after trimming).
    pub fn is_filled(&self) -> bool {
        !self.value.trim().is_empty()
    }
}

/// An externally supplied instruction to set a placeholder value.
///
/// Resolved by name when `name` is present and non-blank, otherwise by the
/// 1-based `order`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,

    #[serde(deserialize_with = "value_as_string")]
    pub value: String,
}

impl UpdateRecord {
    pub fn by_name(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            order: None,
            value: value.into(),
        }
    }

    pub fn by_order(order: u32, value: impl Into<String>) -> Self {
        Self {
            name: None,
            order: Some(order),
            value: value.into(),
        }
    }

    /// The name, if present and not blank.
    pub fn named(&self) -> Option<&str> {
        self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
    }
}

/// A `{name, value}` pair as sent in a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: String,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl From<NamedValue> for UpdateRecord {
    fn from(nv: NamedValue) -> Self {
        UpdateRecord::by_name(nv.name, nv.value)
    }
}

/// What the binder does when the extraction service hands out the same name
/// for more than one occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNamePolicy {
    /// Later repeats get a numeric suffix (`name_2`, `name_3`, …).
    #[default]
    Disambiguate,
    /// Every repeat binds to the same placeholder, sharing one value.
    Share,
}

/// Accept any JSON scalar for a value and keep its string form.
fn value_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
