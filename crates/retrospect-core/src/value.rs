//! Canonical value model for tracked fields.
//!
//! Three layers of "value" exist in the pipeline:
//!
//! 1. [`TypedValue`] — the tracker-native shape of a current field value
//!    (objects with display names, arrays of version objects, plain text).
//! 2. [`FieldValue`] — the canonical in-memory form everything is
//!    normalized to: text or a list of strings.
//! 3. [`Cell`] — one slot of one timeline row, which additionally has to
//!    express *absence*. A cell distinguishes "no information has reached
//!    this row yet" ([`Cell::Missing`]) from "the field was observed to be
//!    explicitly empty" ([`Cell::Unset`]). The distinction is what keeps
//!    the fill passes from re-filling a value that was genuinely cleared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical value of a tracked field after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Scalar fields: plain strings, enum-like names, user display names.
    Text(String),
    /// Array fields: labels, fix versions. An empty list is a legitimate
    /// observed state, not an absence.
    List(Vec<String>),
}

impl FieldValue {
    /// Convenience constructor for text values.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Convenience constructor for list values.
    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

/// One tracked-field slot of one timeline row.
///
/// `Missing` is the fill-pass gap: no observation has reached this row for
/// this field. `Unset` is an *observation* — the tracker reported the field
/// as empty — and propagates through fills exactly like a value. The
/// reconciliation pass at the end of reconstruction collapses `Unset` into
/// `Missing`, so callers of the dense table only ever see value-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    /// No information has reached this row for this field.
    #[default]
    Missing,
    /// The field was observed as explicitly empty.
    Unset,
    /// The field was observed (or reconstructed) to hold a value.
    Value(FieldValue),
}

impl Cell {
    /// True when the cell carries no observation at all.
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// The reconstructed value, if any. `Unset` reads as `None`.
    #[must_use]
    pub const fn as_value(&self) -> Option<&FieldValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Missing | Self::Unset => None,
        }
    }
}

/// A tracker-native typed field value, as delivered by the current-state
/// observation of an issue. String-form changelog values never pass through
/// this type; they are normalized directly from the raw string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    /// A plain string value.
    Text(String),
    /// An object exposing a display name (statuses, priorities,
    /// resolutions, users, version items).
    Named { name: String },
    /// A sequence of items (array fields). Items are `Text` for plain
    /// string arrays and `Named` for version arrays.
    List(Vec<TypedValue>),
}

impl TypedValue {
    /// Convenience constructor for named objects.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named { name: name.into() }
    }

    /// The display form of a single item: text as-is, named objects by
    /// their name. Nested lists flatten to their joined display forms.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Named { name } => name.clone(),
            Self::List(items) => items
                .iter()
                .map(Self::display_name)
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}
