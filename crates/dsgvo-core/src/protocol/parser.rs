//! Protocol parsing from YAML/JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::schema::validate_protocol_schema;

/// Errors that can occur when loading or using protocols.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Failed to read protocol file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Protocol does not match schema: {}", .0.join("; "))]
    SchemaError(Vec<String>),

    #[error("Protocol validation failed: {0}")]
    ValidationError(String),

    #[error("Invalid protocol: {0}")]
    InvalidProtocol(String),
}

/// One compliance category with its criteria.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Stable identifier the model must echo back
    pub key: String,

    /// Human-readable title
    pub title: String,

    /// Optional longer description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Discrete criteria, in display order
    #[serde(default)]
    pub criteria: Vec<String>,
}

impl Category {
    /// Create a category without description.
    pub fn new(key: impl Into<String>, title: impl Into<String>, criteria: Vec<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: None,
            criteria,
        }
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// A category without criteria cannot be assessed.
    pub fn is_applicable(&self) -> bool {
        !self.criteria.is_empty()
    }
}

/// An ordered set of compliance categories.
///
/// Immutable once constructed; a check run borrows it for its whole duration.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Protocol {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) description: Option<String>,

    pub(super) categories: Vec<Category>,
}

/// On-disk shape before validation.
#[derive(Debug, Deserialize)]
struct RawProtocol {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
}

impl Protocol {
    /// Build a protocol from categories.
    ///
    /// Fails if a key or title is blank or a key repeats. An empty category
    /// list is accepted here; see [`Protocol::ensure_checkable`].
    pub fn new(categories: Vec<Category>) -> Result<Self, ProtocolError> {
        let protocol = Self {
            name: None,
            description: None,
            categories,
        };
        protocol.validate()?;
        Ok(protocol)
    }

    /// Set a display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a free-text description of the protocol's purpose.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parse a protocol from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ProtocolError> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Self::from_value(value)
    }

    /// Parse a protocol from JSON string.
    ///
    /// Accepts both the structured format and the legacy flat map
    /// `{"Section": ["criterion", ...]}`.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Parse a protocol file, choosing the format by extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let protocol = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents)?,
            _ => Self::from_json(&contents)?,
        };
        tracing::debug!(
            path = %path.display(),
            categories = protocol.len(),
            "protocol loaded"
        );
        Ok(protocol)
    }

    fn from_value(value: JsonValue) -> Result<Self, ProtocolError> {
        if is_legacy_map(&value) {
            return Self::from_legacy_map(value);
        }

        validate_protocol_schema(&value).map_err(ProtocolError::SchemaError)?;
        let raw: RawProtocol = serde_json::from_value(value)?;

        let protocol = Self {
            name: raw.name,
            description: raw.description,
            categories: raw.categories,
        };
        protocol.validate()?;
        Ok(protocol)
    }

    /// Legacy files map section titles to criteria lists; the title doubles as key.
    fn from_legacy_map(value: JsonValue) -> Result<Self, ProtocolError> {
        let JsonValue::Object(map) = value else {
            return Err(ProtocolError::ValidationError(
                "legacy protocol must be an object".to_string(),
            ));
        };

        let mut categories = Vec::with_capacity(map.len());
        for (section, criteria) in map {
            let criteria: Vec<String> = serde_json::from_value(criteria).map_err(|_| {
                ProtocolError::ValidationError(format!(
                    "criteria of section '{}' must be a list of strings",
                    section
                ))
            })?;
            categories.push(Category::new(section.clone(), section, criteria));
        }

        Self::new(categories)
    }

    /// Serialize to YAML in the structured format.
    pub fn to_yaml(&self) -> Result<String, ProtocolError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Serialize to pretty JSON in the structured format.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate the protocol structure.
    fn validate(&self) -> Result<(), ProtocolError> {
        let mut seen = HashSet::new();

        for category in &self.categories {
            if category.key.trim().is_empty() {
                return Err(ProtocolError::ValidationError(
                    "category key must not be empty".to_string(),
                ));
            }
            if category.title.trim().is_empty() {
                return Err(ProtocolError::ValidationError(format!(
                    "category '{}' has an empty title",
                    category.key
                )));
            }
            if !seen.insert(category.key.as_str()) {
                return Err(ProtocolError::ValidationError(format!(
                    "Duplicate category key: {}",
                    category.key
                )));
            }
        }

        Ok(())
    }

    /// Fail unless the protocol has at least one category.
    ///
    /// Checked before any prompt is built or any remote call is made.
    pub fn ensure_checkable(&self) -> Result<(), ProtocolError> {
        if self.categories.is_empty() {
            return Err(ProtocolError::InvalidProtocol(
                "protocol has no categories".to_string(),
            ));
        }
        Ok(())
    }

    /// Display name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Categories in protocol order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a category by key.
    pub fn category(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// True when there are no categories.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// A legacy map has no `categories` field and only list values.
fn is_legacy_map(value: &JsonValue) -> bool {
    match value {
        JsonValue::Object(map) => {
            !map.is_empty()
                && !map.contains_key("categories")
                && map.values().all(JsonValue::is_array)
        }
        _ => false,
    }
}
