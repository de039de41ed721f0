//! Field schema and catalog.
//!
//! Trackers describe their fields with an id, a human name, and a type
//! string. The catalog resolves caller-supplied field names (and changelog
//! field ids) to schema entries; an unknown or non-trackable field is a
//! hard error, never a silent skip.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The field types the normalizer understands.
///
/// Tracker schemas expose many more type names than these; anything
/// unrecognized is carried as [`FieldType::Unsupported`] so that values can
/// still pass through the pipeline (with a diagnostic) instead of aborting
/// the whole query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldType {
    /// Plain string field.
    Text,
    /// Workflow status (enum-like, exposes a name).
    Status,
    /// Priority (enum-like, exposes a name).
    Priority,
    /// Resolution (enum-like, exposes a name).
    Resolution,
    /// User reference (exposes a display name).
    User,
    /// Array of plain strings (labels).
    StringArray,
    /// Array of version objects (each exposes a name).
    VersionArray,
    /// Any type the normalizer has no handler for. Carries the raw
    /// tracker type name for diagnostics.
    Unsupported(String),
}

impl FieldType {
    /// Canonical type-name string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "string",
            Self::Status => "status",
            Self::Priority => "priority",
            Self::Resolution => "resolution",
            Self::User => "user",
            Self::StringArray => "array-of-string",
            Self::VersionArray => "array-of-version",
            Self::Unsupported(raw) => raw,
        }
    }

    /// True for types whose canonical value is a list.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::StringArray | Self::VersionArray)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    /// Parsing never fails: unknown type names become
    /// [`FieldType::Unsupported`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "string" => Self::Text,
            "status" => Self::Status,
            "priority" => Self::Priority,
            "resolution" => Self::Resolution,
            "user" => Self::User,
            "array-of-string" => Self::StringArray,
            "array-of-version" => Self::VersionArray,
            other => Self::Unsupported(other.to_string()),
        })
    }
}

/// One entry of the tracker's field schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Tracker-internal field id (changelog items reference this).
    pub id: String,
    /// Human-readable field name (callers reference this).
    pub name: String,
    /// Declared value type.
    pub field_type: FieldType,
    /// Whether history can be tracked for this field. Non-trackable
    /// fields resolve as if they did not exist.
    pub trackable: bool,
}

impl FieldSchema {
    /// Construct a trackable schema entry.
    pub fn new(id: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            field_type,
            trackable: true,
        }
    }
}

/// Errors from schema resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// No trackable field exists with the given id or name.
    #[error("field not found: no trackable field with {kind} '{key}'")]
    FieldNotFound {
        /// Which lookup failed: `"id"` or `"name"`.
        kind: &'static str,
        /// The requested id or name.
        key: String,
    },
}

/// Field metadata lookup, by id or by name.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: Vec<FieldSchema>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, usize>,
}

impl FieldCatalog {
    /// Build a catalog from the tracker's schema listing.
    #[must_use]
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        let mut by_id = HashMap::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len());
        for (idx, field) in fields.iter().enumerate() {
            by_id.insert(field.id.clone(), idx);
            by_name.insert(field.name.clone(), idx);
        }
        Self {
            fields,
            by_id,
            by_name,
        }
    }

    /// Look up a trackable field by tracker-internal id.
    ///
    /// # Errors
    ///
    /// [`SchemaError::FieldNotFound`] if the id is unknown or the field is
    /// flagged non-trackable.
    pub fn by_id(&self, id: &str) -> Result<&FieldSchema, SchemaError> {
        self.lookup(self.by_id.get(id), "id", id)
    }

    /// Look up a trackable field by human-readable name.
    ///
    /// # Errors
    ///
    /// [`SchemaError::FieldNotFound`] if the name is unknown or the field
    /// is flagged non-trackable.
    pub fn by_name(&self, name: &str) -> Result<&FieldSchema, SchemaError> {
        self.lookup(self.by_name.get(name), "name", name)
    }

    fn lookup(
        &self,
        idx: Option<&usize>,
        kind: &'static str,
        key: &str,
    ) -> Result<&FieldSchema, SchemaError> {
        idx.map(|&i| &self.fields[i])
            .filter(|f| f.trackable)
            .ok_or_else(|| SchemaError::FieldNotFound {
                kind,
                key: key.to_string(),
            })
    }

    /// Number of schema entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the catalog holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
