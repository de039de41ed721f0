//! Timeline builder: raw issue records in, sparse event table out.
//!
//! For each issue the builder emits one `Initial` row (nothing observed),
//! one `Change` row per tracked changelog item, and one `Current` row
//! (everything observed). Rows sort by `(issue_id, at, kind rank,
//! item_index)` — the ordering contract the reconstructor depends on:
//! rows of one issue are contiguous, an `Initial` row precedes any change
//! at the same instant, a `Current` row follows, and simultaneous changes
//! order deterministically by their item index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::normalize::{normalize_string, normalize_typed};
use crate::schema::{FieldCatalog, FieldSchema, SchemaError};
use crate::source::IssueRecord;
use crate::value::Cell;

/// The three kinds of timeline row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    /// Synthetic anchor at issue creation; field values unknown.
    Initial,
    /// One changelog item: a single field's old and new value.
    Change,
    /// Synthetic anchor at query time; every field value known.
    Current,
}

impl RowKind {
    /// Tie-break rank at identical timestamps: Initial before Change
    /// before Current.
    pub(crate) const fn rank(self) -> u8 {
        match self {
            Self::Initial => 0,
            Self::Change => 1,
            Self::Current => 2,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Change => "change",
            Self::Current => "current",
        }
    }
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change metadata carried only by `Change` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSlot {
    /// Tracker-assigned id of the change event this item belongs to.
    pub change_id: String,
    /// Position of this item within its change event. Deterministic
    /// tie-break for simultaneous changes.
    pub item_index: u32,
    /// Column (index into the tracked-field list) this item mutates.
    pub column: usize,
    /// Normalized value before the change.
    pub from: Cell,
    /// Normalized value after the change.
    pub to: Cell,
}

/// One row of the (sparse or dense) event table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineRow {
    /// Issue this row belongs to.
    pub issue_id: String,
    /// Row kind.
    pub kind: RowKind,
    /// Event instant.
    pub at: DateTime<Utc>,
    /// Display name of the actor (reporter, change author, or "System"
    /// for the current observation).
    pub author: String,
    /// Change metadata; `None` for `Initial`/`Current` rows.
    pub change: Option<ChangeSlot>,
    /// One cell per tracked field, parallel to [`TrackedFields`].
    pub cells: Vec<Cell>,
}

impl TimelineRow {
    /// Item index used in ordering; 0 for non-change rows.
    #[must_use]
    pub fn item_index(&self) -> u32 {
        self.change.as_ref().map_or(0, |c| c.item_index)
    }
}

/// The ordered list of resolved tracked-field schemas. Row cells are
/// positionally parallel to this list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFields(Vec<FieldSchema>);

impl TrackedFields {
    /// Resolve caller-supplied field names against the catalog, preserving
    /// order.
    ///
    /// # Errors
    ///
    /// [`SchemaError::FieldNotFound`] for the first unresolvable name; no
    /// partial result.
    pub fn resolve(names: &[String], catalog: &FieldCatalog) -> Result<Self, SchemaError> {
        let fields = names
            .iter()
            .map(|name| catalog.by_name(name).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(fields))
    }

    /// Number of tracked fields (the table's column count).
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no fields are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Schema of the given column.
    #[must_use]
    pub fn get(&self, column: usize) -> &FieldSchema {
        &self.0[column]
    }

    /// Iterate the tracked schemas in column order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldSchema> {
        self.0.iter()
    }

    /// Column of the field with the given tracker id, if tracked.
    #[must_use]
    pub fn column_for_id(&self, field_id: &str) -> Option<usize> {
        self.0.iter().position(|f| f.id == field_id)
    }
}

/// The event table: tracked-field columns plus ordered rows. Sparse as
/// produced by [`build`], dense after
/// [`reconstruct`](crate::reconstruct::reconstruct).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Tracked-field columns.
    pub fields: TrackedFields,
    /// Ordered rows.
    pub rows: Vec<TimelineRow>,
}

impl Table {
    /// Iterate the rows belonging to one issue.
    pub fn rows_for<'a>(&'a self, issue_id: &'a str) -> impl Iterator<Item = &'a TimelineRow> {
        self.rows.iter().filter(move |r| r.issue_id == issue_id)
    }
}

/// Build the sparse event table for a set of issues.
///
/// Every tracked field name must resolve; changelog items referencing
/// untracked fields are silently skipped.
///
/// # Errors
///
/// [`SchemaError::FieldNotFound`] if any tracked field name is
/// unresolvable.
pub fn build(
    issues: &[IssueRecord],
    tracked_field_names: &[String],
    catalog: &FieldCatalog,
) -> Result<Table, SchemaError> {
    let fields = TrackedFields::resolve(tracked_field_names, catalog)?;
    let mut rows = Vec::new();

    for issue in issues {
        let before = rows.len();
        rows.push(initial_row(issue, fields.len()));
        push_change_rows(&mut rows, issue, &fields);
        rows.push(current_row(issue, &fields));
        debug!(
            issue_id = %issue.id,
            rows = rows.len() - before,
            "built sparse timeline rows"
        );
    }

    rows.sort_by(|a, b| {
        a.issue_id
            .cmp(&b.issue_id)
            .then_with(|| a.at.cmp(&b.at))
            .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
            .then_with(|| a.item_index().cmp(&b.item_index()))
    });

    info!(
        issues = issues.len(),
        tracked = fields.len(),
        rows = rows.len(),
        "sparse event table built"
    );

    Ok(Table { fields, rows })
}

fn initial_row(issue: &IssueRecord, columns: usize) -> TimelineRow {
    TimelineRow {
        issue_id: issue.id.clone(),
        kind: RowKind::Initial,
        at: issue.created_at,
        author: issue.reporter.clone(),
        change: None,
        cells: vec![Cell::Missing; columns],
    }
}

fn push_change_rows(rows: &mut Vec<TimelineRow>, issue: &IssueRecord, fields: &TrackedFields) {
    for change in &issue.changes {
        for (item_index, item) in change.items.iter().enumerate() {
            // Untracked fields are simply not part of the table.
            let Some(column) = fields.column_for_id(&item.field_id) else {
                continue;
            };
            let field_type = &fields.get(column).field_type;
            rows.push(TimelineRow {
                issue_id: issue.id.clone(),
                kind: RowKind::Change,
                at: change.at,
                author: change.author.clone(),
                change: Some(ChangeSlot {
                    change_id: change.id.clone(),
                    item_index: u32::try_from(item_index).unwrap_or(u32::MAX),
                    column,
                    from: normalize_string(field_type, item.from.as_deref()),
                    to: normalize_string(field_type, item.to.as_deref()),
                }),
                cells: vec![Cell::Missing; fields.len()],
            });
        }
    }
}

fn current_row(issue: &IssueRecord, fields: &TrackedFields) -> TimelineRow {
    let cells = fields
        .iter()
        .map(|f| normalize_typed(&f.field_type, issue.current.get(&f.id).and_then(Option::as_ref)))
        .collect();
    TimelineRow {
        issue_id: issue.id.clone(),
        kind: RowKind::Current,
        at: issue.fetched_at,
        author: "System".to_string(),
        change: None,
        cells,
    }
}
