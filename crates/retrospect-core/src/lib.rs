//! retrospect-core: reconstructs the full value-over-time history of
//! tracked issue fields from a sparse change log.
//!
//! An issue tracker only hands back three kinds of observation per issue:
//! a creation event with no field values, change events each naming one
//! field's old and new value, and the fully-known current state at query
//! time. This crate stitches those into a dense timeline where every row
//! carries every tracked field, and answers point-in-time snapshot
//! queries over the result.
//!
//! Pipeline: [`source::IssueRecord`]s → [`timeline::build`] (sparse event
//! table) → [`reconstruct::reconstruct`] (gap-filled dense timeline) →
//! [`snapshot::snapshot`] (state at a cutoff). [`machine::TimeMachine`]
//! composes the whole thing over an abstract [`source::IssueSource`].
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums in the core, `anyhow` at the facade.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod machine;
pub mod normalize;
pub mod reconstruct;
pub mod schema;
pub mod snapshot;
pub mod source;
pub mod timeline;
pub mod value;

pub use machine::TimeMachine;
pub use reconstruct::reconstruct;
pub use schema::{FieldCatalog, FieldSchema, FieldType, SchemaError};
pub use snapshot::{Snapshot, SnapshotRow, snapshot};
pub use source::{ChangeItem, ChangeRecord, IssueRecord, IssueSource};
pub use timeline::{ChangeSlot, RowKind, Table, TimelineRow, TrackedFields, build};
pub use value::{Cell, FieldValue, TypedValue};
