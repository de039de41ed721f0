//! Value normalization, per declared field type.
//!
//! Two entry points mirror the two shapes tracker data arrives in:
//!
//! - [`normalize_typed`] for the fully-typed current-state observation;
//! - [`normalize_string`] for the human-readable changelog `from`/`to`
//!   strings.
//!
//! The subtle part is empties. For scalar types an empty changelog string
//! means "the field was unset at that point", which must become
//! [`Cell::Unset`] so the fill passes treat it as an observation rather
//! than a gap. For array types an empty string means an empty list — a
//! perfectly ordinary value. A typed `None` of any type is `Unset`.
//!
//! Unsupported field types degrade instead of failing: the value passes
//! through unchanged with a `warn!` diagnostic.

use tracing::warn;

use crate::schema::FieldType;
use crate::value::{Cell, FieldValue, TypedValue};

/// Normalize a typed current-state value for a field.
#[must_use]
pub fn normalize_typed(field_type: &FieldType, value: Option<&TypedValue>) -> Cell {
    let Some(value) = value else {
        return Cell::Unset;
    };

    match (field_type, value) {
        (
            FieldType::Text | FieldType::Status | FieldType::Priority | FieldType::Resolution,
            TypedValue::Text(s),
        ) => Cell::Value(FieldValue::Text(s.clone())),
        // Enum-like and user values arrive as objects exposing a name.
        (
            FieldType::Text
            | FieldType::Status
            | FieldType::Priority
            | FieldType::Resolution
            | FieldType::User,
            TypedValue::Named { name },
        ) => Cell::Value(FieldValue::Text(name.clone())),
        // A user value that is already a display-name string.
        (FieldType::User, TypedValue::Text(s)) => Cell::Value(FieldValue::Text(s.clone())),
        (FieldType::StringArray | FieldType::VersionArray, TypedValue::List(items)) => {
            Cell::Value(FieldValue::List(
                items.iter().map(TypedValue::display_name).collect(),
            ))
        }
        (FieldType::Unsupported(raw), value) => {
            warn!(
                field_type = %raw,
                "unsupported field type, passing value through unchanged"
            );
            passthrough(value)
        }
        (field_type, value) => {
            warn!(
                field_type = %field_type,
                "typed value does not match declared field type, passing through"
            );
            passthrough(value)
        }
    }
}

/// Normalize a changelog string-form value for a field.
///
/// `raw` is `None` when the changelog carried a null (no prior/next value).
#[must_use]
pub fn normalize_string(field_type: &FieldType, raw: Option<&str>) -> Cell {
    match field_type {
        // An empty string for an array type is an empty list, not an
        // absence: "labels cleared" is an observed state.
        FieldType::StringArray | FieldType::VersionArray => {
            let raw = raw.unwrap_or("");
            Cell::Value(FieldValue::List(
                raw.split_whitespace().map(str::to_owned).collect(),
            ))
        }
        FieldType::Unsupported(raw_type) => match raw {
            None => Cell::Unset,
            Some(s) => {
                warn!(
                    field_type = %raw_type,
                    "unsupported field type, passing value through unchanged"
                );
                Cell::Value(FieldValue::Text(s.to_owned()))
            }
        },
        // Scalar types: empty string means "unset at that point".
        FieldType::Text
        | FieldType::Status
        | FieldType::Priority
        | FieldType::Resolution
        | FieldType::User => match raw {
            None | Some("") => Cell::Unset,
            Some(s) => Cell::Value(FieldValue::Text(s.to_owned())),
        },
    }
}

/// Best-effort conversion used when the declared type gives no guidance.
fn passthrough(value: &TypedValue) -> Cell {
    match value {
        TypedValue::Text(s) => Cell::Value(FieldValue::Text(s.clone())),
        TypedValue::Named { name } => Cell::Value(FieldValue::Text(name.clone())),
        TypedValue::List(items) => Cell::Value(FieldValue::List(
            items.iter().map(TypedValue::display_name).collect(),
        )),
    }
}
