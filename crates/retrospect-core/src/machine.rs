//! The `TimeMachine` facade: query an issue source, reconstruct the dense
//! timeline, and answer point-in-time snapshot queries over it.

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::reconstruct::reconstruct;
use crate::schema::FieldCatalog;
use crate::snapshot::{self, Snapshot};
use crate::source::IssueSource;
use crate::timeline::{self, Table};

/// Reconstructs issue field histories on top of an [`IssueSource`].
#[derive(Debug)]
pub struct TimeMachine<S> {
    source: S,
}

impl<S: IssueSource> TimeMachine<S> {
    /// Wrap an issue source.
    pub const fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetch every issue matching `query` and reconstruct the full
    /// value-over-time table for the given tracked fields.
    ///
    /// # Errors
    ///
    /// Source errors propagate unmodified; an unresolvable tracked field
    /// name fails with a field-not-found error naming it.
    pub fn build_history(
        &self,
        query: &str,
        tracked_field_names: &[String],
    ) -> anyhow::Result<Table> {
        let catalog = FieldCatalog::new(
            self.source
                .fields()
                .context("fetching tracker field schema")?,
        );
        let issues = self
            .source
            .search(query)
            .context("searching tracker issues")?;
        info!(
            query,
            issues = issues.len(),
            tracked = tracked_field_names.len(),
            "building issue history"
        );
        let sparse = timeline::build(&issues, tracked_field_names, &catalog)?;
        Ok(reconstruct(sparse))
    }

    /// Project the state of every issue at `cutoff` from a reconstructed
    /// table.
    #[must_use]
    pub fn snapshot(table: &Table, cutoff: DateTime<Utc>) -> Snapshot {
        snapshot::snapshot(table, cutoff)
    }
}
