//! Point-in-time snapshot projection over the dense timeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::timeline::{Table, TimelineRow};
use crate::value::FieldValue;

/// Tracked-field values of one issue at the snapshot instant, keyed by
/// field name. `None` means the field had no known value at that time.
pub type SnapshotRow = BTreeMap<String, Option<FieldValue>>;

/// The projected state of every issue at a cutoff instant.
///
/// Issues with no timeline row at or before the cutoff did not exist yet
/// and are absent. Keys iterate in ascending issue-id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The cutoff instant this snapshot was taken at.
    pub at: DateTime<Utc>,
    /// Per-issue projected field values.
    pub rows: BTreeMap<String, SnapshotRow>,
}

/// Project the latest known state of every issue at or before `cutoff`.
///
/// Among an issue's rows with `at <= cutoff`, the one with the greatest
/// `(at, kind rank, item_index)` wins; only tracked fields are projected,
/// bookkeeping columns are dropped.
#[must_use]
pub fn snapshot(table: &Table, cutoff: DateTime<Utc>) -> Snapshot {
    let mut latest: BTreeMap<&str, &TimelineRow> = BTreeMap::new();
    for row in table.rows.iter().filter(|r| r.at <= cutoff) {
        match latest.get(row.issue_id.as_str()) {
            Some(prev) if sort_key(prev) > sort_key(row) => {}
            _ => {
                latest.insert(&row.issue_id, row);
            }
        }
    }

    let rows: BTreeMap<String, SnapshotRow> = latest
        .into_iter()
        .map(|(issue_id, row)| {
            let fields = table
                .fields
                .iter()
                .zip(&row.cells)
                .map(|(schema, cell)| (schema.name.clone(), cell.as_value().cloned()))
                .collect();
            (issue_id.to_string(), fields)
        })
        .collect();

    debug!(cutoff = %cutoff, issues = rows.len(), "snapshot projected");
    Snapshot { at: cutoff, rows }
}

fn sort_key(row: &TimelineRow) -> (DateTime<Utc>, u8, u32) {
    (row.at, row.kind.rank(), row.item_index())
}
