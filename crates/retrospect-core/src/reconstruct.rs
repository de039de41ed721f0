//! Gap-fill reconstruction: sparse event table in, dense timeline out.
//!
//! The sparse table carries full information only on `Current` rows and a
//! single `from`/`to` pair on each `Change` row. Reconstruction stitches
//! these observations together so that *every* row carries *every* tracked
//! field:
//!
//! 1. seed each change row's changed column with its `to` value;
//! 2. forward-fill every column, so a row holds the most recent `to`
//!    observed at or before it;
//! 3. overwrite each change row's changed column with its `from` value —
//!    the anchor the backward pass needs;
//! 4. backward-fill every column, reconstructing the value in effect
//!    right up until each change, all the way back to the `Initial` row;
//! 5. re-seed `to` values, so a change row reflects the post-change state;
//! 6. collapse the explicit-empty marker ([`Cell::Unset`]) into
//!    [`Cell::Missing`] — the caller-visible "no value";
//! 7. drop `Current` rows: their job was to anchor the backward pass, and
//!    the last surviving row of each issue now carries the same state;
//! 8. final sort by `(at, kind rank, item_index)`.
//!
//! Fills operate strictly within one issue's contiguous row range, so a
//! value can never leak from the tail of one issue into the head of the
//! next. Each pass is a pure `Table -> Table` function, which keeps the
//! multi-pass algorithm auditable and testable per pass.

use tracing::{debug, warn};

use crate::timeline::{RowKind, Table, TimelineRow};
use crate::value::Cell;

/// Reconstruct the dense timeline from a sparse event table.
///
/// Expects the row ordering produced by [`crate::timeline::build`]: rows
/// of one issue contiguous, sorted by `(at, kind rank, item_index)`.
#[must_use]
pub fn reconstruct(table: Table) -> Table {
    let table = seed_to_values(table);
    let table = forward_fill(table);
    let table = seed_from_values(table);
    let table = backward_fill(table);
    let table = seed_to_values(table);
    let table = reconcile_unset(table);
    check_current_consistency(&table);
    let table = drop_current_rows(table);
    finalize_order(table)
}

/// Copy each change row's `to` value into its own changed column.
fn seed_to_values(mut table: Table) -> Table {
    for row in &mut table.rows {
        if let Some(slot) = &row.change {
            row.cells[slot.column] = slot.to.clone();
        }
    }
    table
}

/// Overwrite each change row's changed column with its `from` value.
///
/// This deliberately discards the forward-pass result for that one cell:
/// the backward pass needs the pre-change value as its anchor.
fn seed_from_values(mut table: Table) -> Table {
    for row in &mut table.rows {
        if let Some(slot) = &row.change {
            row.cells[slot.column] = slot.from.clone();
        }
    }
    table
}

/// Propagate values downward within each issue partition. `Unset` is an
/// observation and propagates like any value.
fn forward_fill(mut table: Table) -> Table {
    let columns = table.fields.len();
    for (start, end) in issue_partitions(&table.rows) {
        for col in 0..columns {
            let mut carry: Option<Cell> = None;
            for row in &mut table.rows[start..end] {
                if row.cells[col].is_missing() {
                    if let Some(v) = &carry {
                        row.cells[col] = v.clone();
                    }
                } else {
                    carry = Some(row.cells[col].clone());
                }
            }
        }
    }
    table
}

/// Propagate values upward within each issue partition.
fn backward_fill(mut table: Table) -> Table {
    let columns = table.fields.len();
    for (start, end) in issue_partitions(&table.rows) {
        for col in 0..columns {
            let mut carry: Option<Cell> = None;
            for row in table.rows[start..end].iter_mut().rev() {
                if row.cells[col].is_missing() {
                    if let Some(v) = &carry {
                        row.cells[col] = v.clone();
                    }
                } else {
                    carry = Some(row.cells[col].clone());
                }
            }
        }
    }
    table
}

/// Collapse `Unset` (observed explicitly empty) into `Missing` (no value).
/// Past this point the distinction has done its job of surviving the fill
/// passes and the caller only sees value-or-nothing.
fn reconcile_unset(mut table: Table) -> Table {
    for row in &mut table.rows {
        for cell in &mut row.cells {
            if *cell == Cell::Unset {
                *cell = Cell::Missing;
            }
        }
    }
    table
}

/// Compare each `Current` row against the last surviving row of its issue.
///
/// The reconstruction never *requires* these to agree (a tracker can hand
/// back a changelog that does not add up to the current state), so a
/// mismatch is a diagnostic, not an error.
fn check_current_consistency(table: &Table) {
    for (start, end) in issue_partitions(&table.rows) {
        let rows = &table.rows[start..end];
        let Some(current) = rows.iter().rev().find(|r| r.kind == RowKind::Current) else {
            continue;
        };
        let Some(last_kept) = rows.iter().rev().find(|r| r.kind != RowKind::Current) else {
            continue;
        };
        for (col, (reconstructed, observed)) in
            last_kept.cells.iter().zip(&current.cells).enumerate()
        {
            if reconstructed.as_value() != observed.as_value() {
                warn!(
                    issue_id = %current.issue_id,
                    field = %table.fields.get(col).name,
                    ?reconstructed,
                    ?observed,
                    "reconstructed state disagrees with observed current value"
                );
            }
        }
    }
}

/// Remove the `Current` scaffolding rows.
fn drop_current_rows(mut table: Table) -> Table {
    let before = table.rows.len();
    table.rows.retain(|r| r.kind != RowKind::Current);
    debug!(dropped = before - table.rows.len(), "dropped current anchor rows");
    table
}

/// Final ordering: issue grouping is no longer needed downstream, but the
/// output stays reproducible.
fn finalize_order(mut table: Table) -> Table {
    table.rows.sort_by(|a, b| {
        a.at.cmp(&b.at)
            .then_with(|| a.kind.rank().cmp(&b.kind.rank()))
            .then_with(|| a.item_index().cmp(&b.item_index()))
            .then_with(|| a.issue_id.cmp(&b.issue_id))
    });
    table
}

/// Contiguous `[start, end)` row ranges per issue. Relies on the build
/// sort keeping each issue's rows adjacent.
fn issue_partitions(rows: &[TimelineRow]) -> Vec<(usize, usize)> {
    let mut partitions = Vec::new();
    let mut start = 0;
    for i in 1..=rows.len() {
        if i == rows.len() || rows[i].issue_id != rows[start].issue_id {
            partitions.push((start, i));
            start = i;
        }
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldCatalog, FieldSchema, FieldType};
    use crate::source::{ChangeItem, ChangeRecord, IssueRecord};
    use crate::timeline::build;
    use crate::value::{FieldValue, TypedValue};
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::BTreeMap;

    // -------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().expect("valid ts")
    }

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(vec![
            FieldSchema::new("f-status", "status", FieldType::Status),
            FieldSchema::new("f-prio", "priority", FieldType::Priority),
            FieldSchema::new("f-labels", "labels", FieldType::StringArray),
        ])
    }

    fn issue(
        id: &str,
        changes: Vec<ChangeRecord>,
        current: &[(&str, Option<TypedValue>)],
    ) -> IssueRecord {
        IssueRecord {
            id: id.to_string(),
            created_at: ts(0),
            reporter: "Ada".to_string(),
            changes,
            current: current
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
            fetched_at: ts(10_000),
        }
    }

    fn change(id: &str, secs: i64, field_id: &str, from: Option<&str>, to: Option<&str>) -> ChangeRecord {
        ChangeRecord {
            id: id.to_string(),
            at: ts(secs),
            author: "Brian".to_string(),
            items: vec![ChangeItem {
                field_id: field_id.to_string(),
                from: from.map(str::to_owned),
                to: to.map(str::to_owned),
            }],
        }
    }

    fn text(s: &str) -> Cell {
        Cell::Value(FieldValue::text(s))
    }

    fn sparse(issues: &[IssueRecord], tracked: &[&str]) -> Table {
        let names: Vec<String> = tracked.iter().map(|s| (*s).to_string()).collect();
        build(issues, &names, &catalog()).expect("build sparse table")
    }

    // -------------------------------------------------------------------
    // Per-pass tests
    // -------------------------------------------------------------------

    #[test]
    fn seed_to_fills_only_the_changed_column() {
        let table = sparse(
            &[issue(
                "A-1",
                vec![change("c1", 100, "f-status", Some("New"), Some("Open"))],
                &[("f-status", Some(TypedValue::named("Open")))],
            )],
            &["status", "priority"],
        );
        let table = seed_to_values(table);
        let row = table
            .rows
            .iter()
            .find(|r| r.kind == RowKind::Change)
            .expect("change row");
        assert_eq!(row.cells[0], text("Open"));
        assert_eq!(row.cells[1], Cell::Missing);
    }

    #[test]
    fn forward_fill_respects_issue_partitions() {
        let table = sparse(
            &[
                issue(
                    "A-1",
                    vec![change("c1", 100, "f-status", Some("New"), Some("Open"))],
                    &[("f-status", Some(TypedValue::named("Open")))],
                ),
                issue("B-1", vec![], &[("f-status", Some(TypedValue::named("Done")))]),
            ],
            &["status"],
        );
        let table = forward_fill(seed_to_values(table));
        // B-1's initial row must not have picked up A-1's trailing value.
        let b_initial = table
            .rows
            .iter()
            .find(|r| r.issue_id == "B-1" && r.kind == RowKind::Initial)
            .expect("B-1 initial");
        assert_eq!(b_initial.cells[0], Cell::Missing);
    }

    #[test]
    fn forward_fill_propagates_unset() {
        // status cleared at c1: the later rows must read unset, not be
        // re-filled with an older value.
        let table = sparse(
            &[issue(
                "A-1",
                vec![
                    change("c1", 100, "f-status", Some("Open"), Some("")),
                    change("c2", 200, "f-prio", Some("Minor"), Some("Major")),
                ],
                &[("f-prio", Some(TypedValue::named("Major")))],
            )],
            &["status", "priority"],
        );
        let table = forward_fill(seed_to_values(table));
        let c2 = table
            .rows
            .iter()
            .find(|r| r.change.as_ref().is_some_and(|c| c.change_id == "c2"))
            .expect("c2 row");
        assert_eq!(c2.cells[0], Cell::Unset);
    }

    #[test]
    fn backward_fill_reaches_the_initial_row() {
        let table = sparse(
            &[issue(
                "A-1",
                vec![change("c1", 100, "f-status", Some("New"), Some("Open"))],
                &[("f-status", Some(TypedValue::named("Open")))],
            )],
            &["status"],
        );
        let table = backward_fill(seed_from_values(forward_fill(seed_to_values(table))));
        let initial = table
            .rows
            .iter()
            .find(|r| r.kind == RowKind::Initial)
            .expect("initial row");
        assert_eq!(initial.cells[0], text("New"));
    }

    #[test]
    fn reconcile_collapses_unset_to_missing() {
        let table = sparse(
            &[issue("A-1", vec![], &[("f-status", None)])],
            &["status"],
        );
        let table = reconcile_unset(backward_fill(forward_fill(table)));
        for row in &table.rows {
            assert_eq!(row.cells[0], Cell::Missing);
        }
    }

    #[test]
    fn partitions_cover_all_rows() {
        let table = sparse(
            &[
                issue("A-1", vec![], &[("f-status", None)]),
                issue("B-1", vec![], &[("f-status", None)]),
            ],
            &["status"],
        );
        let parts = issue_partitions(&table.rows);
        assert_eq!(parts, vec![(0, 2), (2, 4)]);
    }

    // -------------------------------------------------------------------
    // Full-pipeline tests
    // -------------------------------------------------------------------

    #[test]
    fn concrete_scenario_from_the_sparse_log() {
        // E1 created at T0; status New -> Submitted at T1; current at T2
        // shows status=Submitted, priority=Major.
        let table = sparse(
            &[issue(
                "E1",
                vec![change("c1", 100, "f-status", Some("New"), Some("Submitted"))],
                &[
                    ("f-status", Some(TypedValue::named("Submitted"))),
                    ("f-prio", Some(TypedValue::named("Major"))),
                ],
            )],
            &["status", "priority"],
        );
        let dense = reconstruct(table);

        assert_eq!(dense.rows.len(), 2, "current row dropped");
        let initial = &dense.rows[0];
        assert_eq!(initial.kind, RowKind::Initial);
        assert_eq!(initial.cells[0], text("New"), "status backfilled");
        assert_eq!(initial.cells[1], text("Major"), "priority backfilled");
        let change_row = &dense.rows[1];
        assert_eq!(change_row.kind, RowKind::Change);
        assert_eq!(change_row.cells[0], text("Submitted"));
        assert_eq!(change_row.cells[1], text("Major"));
    }

    #[test]
    fn no_change_issue_collapses_to_one_informative_row() {
        let dense = reconstruct(sparse(
            &[issue(
                "A-1",
                vec![],
                &[
                    ("f-status", Some(TypedValue::named("Done"))),
                    ("f-prio", Some(TypedValue::named("Minor"))),
                ],
            )],
            &["status", "priority"],
        ));
        assert_eq!(dense.rows.len(), 1);
        let row = &dense.rows[0];
        assert_eq!(row.kind, RowKind::Initial);
        assert_eq!(row.cells[0], text("Done"));
        assert_eq!(row.cells[1], text("Minor"));
    }

    #[test]
    fn boundary_containment_between_two_issues() {
        // A (current status X) and B (current status Y), neither with
        // changes: B's initial row must read Y, never A's X.
        let dense = reconstruct(sparse(
            &[
                issue("A-1", vec![], &[("f-status", Some(TypedValue::named("X")))]),
                issue("B-1", vec![], &[("f-status", Some(TypedValue::named("Y")))]),
            ],
            &["status"],
        ));
        let by_id = |id: &str| {
            dense
                .rows
                .iter()
                .find(|r| r.issue_id == id)
                .expect("row for issue")
        };
        assert_eq!(by_id("A-1").cells[0], text("X"));
        assert_eq!(by_id("B-1").cells[0], text("Y"));
    }

    #[test]
    fn change_rows_end_with_their_own_to_value() {
        let dense = reconstruct(sparse(
            &[issue(
                "A-1",
                vec![
                    change("c1", 100, "f-status", Some("New"), Some("Open")),
                    change("c2", 200, "f-status", Some("Open"), Some("Done")),
                ],
                &[("f-status", Some(TypedValue::named("Done")))],
            )],
            &["status"],
        ));
        for row in dense.rows.iter().filter(|r| r.kind == RowKind::Change) {
            let slot = row.change.as_ref().expect("change slot");
            assert_eq!(
                row.cells[slot.column].as_value(),
                slot.to.as_value(),
                "change row must carry its own post-change value"
            );
        }
    }

    #[test]
    fn explicitly_cleared_scalar_reads_as_nothing() {
        // Resolution cleared at c1: every row at or after c1 reads None,
        // not a stale value and not an empty string.
        let dense = reconstruct(sparse(
            &[issue(
                "A-1",
                vec![change("c1", 100, "f-status", Some("Fixed"), Some(""))],
                &[("f-status", None)],
            )],
            &["status"],
        ));
        let initial = &dense.rows[0];
        assert_eq!(initial.cells[0], text("Fixed"), "pre-clear value backfilled");
        let cleared = &dense.rows[1];
        assert_eq!(cleared.cells[0], Cell::Missing);
    }

    #[test]
    fn cleared_array_reads_as_empty_list() {
        let dense = reconstruct(sparse(
            &[issue(
                "A-1",
                vec![change("c1", 100, "f-labels", Some("infra ux"), Some(""))],
                &[("f-labels", Some(TypedValue::List(vec![])))],
            )],
            &["labels"],
        ));
        let initial = &dense.rows[0];
        assert_eq!(initial.cells[0], Cell::Value(FieldValue::list(["infra", "ux"])));
        let cleared = &dense.rows[1];
        assert_eq!(cleared.cells[0], Cell::Value(FieldValue::List(vec![])));
    }

    #[test]
    fn simultaneous_multi_field_edit_fills_both_columns() {
        let edit = ChangeRecord {
            id: "c1".to_string(),
            at: ts(100),
            author: "Brian".to_string(),
            items: vec![
                ChangeItem {
                    field_id: "f-status".to_string(),
                    from: Some("New".to_string()),
                    to: Some("Open".to_string()),
                },
                ChangeItem {
                    field_id: "f-prio".to_string(),
                    from: Some("Minor".to_string()),
                    to: Some("Major".to_string()),
                },
            ],
        };
        let dense = reconstruct(sparse(
            &[issue(
                "A-1",
                vec![edit],
                &[
                    ("f-status", Some(TypedValue::named("Open"))),
                    ("f-prio", Some(TypedValue::named("Major"))),
                ],
            )],
            &["status", "priority"],
        ));

        assert_eq!(dense.rows.len(), 3);
        let initial = &dense.rows[0];
        assert_eq!(initial.cells[0], text("New"));
        assert_eq!(initial.cells[1], text("Minor"));
        // First item row: status changed, priority still pre-change.
        assert_eq!(dense.rows[1].cells[0], text("Open"));
        assert_eq!(dense.rows[1].cells[1], text("Minor"));
        // Second item row: both post-change.
        assert_eq!(dense.rows[2].cells[0], text("Open"));
        assert_eq!(dense.rows[2].cells[1], text("Major"));
    }

    #[test]
    fn final_order_is_by_timestamp_across_issues() {
        let mut a = issue(
            "A-1",
            vec![change("c1", 300, "f-status", Some("New"), Some("Open"))],
            &[("f-status", Some(TypedValue::named("Open")))],
        );
        a.created_at = ts(0);
        let mut b = issue(
            "B-1",
            vec![change("c2", 200, "f-status", Some("New"), Some("Done"))],
            &[("f-status", Some(TypedValue::named("Done")))],
        );
        b.created_at = ts(100);

        let dense = reconstruct(sparse(&[a, b], &["status"]));
        let ats: Vec<_> = dense.rows.iter().map(|r| r.at).collect();
        let mut sorted = ats.clone();
        sorted.sort();
        assert_eq!(ats, sorted);
    }
}
