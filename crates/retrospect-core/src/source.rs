//! The interface the core needs from a tracker-access collaborator.
//!
//! The core never talks to a network. Whatever fetches issues (with their
//! changelogs) and the field schema implements [`IssueSource`]; the records
//! here are the plain-data handoff shape. Collaborator errors propagate
//! unmodified through `anyhow` — the core adds no retry or recovery of its
//! own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::FieldSchema;
use crate::value::TypedValue;

/// One field mutation within a change event.
///
/// `from`/`to` are the human-readable changelog strings; trackers deliver
/// nulls for "was/became unset", hence the `Option`s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeItem {
    /// Tracker-internal id of the mutated field.
    pub field_id: String,
    /// String form of the value before the change.
    pub from: Option<String>,
    /// String form of the value after the change.
    pub to: Option<String>,
}

/// One change event from an issue's changelog. A single edit touching
/// several fields arrives as one event with several items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Tracker-assigned change id.
    pub id: String,
    /// When the change happened.
    pub at: DateTime<Utc>,
    /// Display name of whoever made the change.
    pub author: String,
    /// The field mutations in this event.
    pub items: Vec<ChangeItem>,
}

/// Everything the core needs to know about one issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    /// Issue key/id.
    pub id: String,
    /// Creation instant. Field values at creation are not observed.
    pub created_at: DateTime<Utc>,
    /// Display name of the reporter (adapter supplies a fallback such as
    /// "Unknown" when the tracker omits it).
    pub reporter: String,
    /// Change events, in any order; the timeline builder sorts.
    pub changes: Vec<ChangeRecord>,
    /// Fully-typed current field values, keyed by field id. A missing key
    /// or `None` value both mean the field is currently unset.
    pub current: BTreeMap<String, Option<TypedValue>>,
    /// Instant the current observation was taken.
    pub fetched_at: DateTime<Utc>,
}

/// Tracker-access collaborator: issue search plus field schema.
pub trait IssueSource {
    /// Run a tracker query and return matching issues with their full
    /// change history and current state.
    ///
    /// # Errors
    ///
    /// Whatever the collaborator's transport produces; propagated to the
    /// caller unmodified.
    fn search(&self, query: &str) -> anyhow::Result<Vec<IssueRecord>>;

    /// Fetch the tracker's field schema.
    ///
    /// # Errors
    ///
    /// Whatever the collaborator's transport produces; propagated to the
    /// caller unmodified.
    fn fields(&self) -> anyhow::Result<Vec<FieldSchema>>;
}
