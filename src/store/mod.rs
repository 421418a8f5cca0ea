//! Record Store
//!
//! The gateway owns the single SQLite connection of a session and executes
//! the statements built by the schema mapper. Store failures are caught here,
//! logged with the statement that caused them, and turned into `None`/`false`
//! results; callers decide whether a missing result matters.

pub mod gateway;
pub mod install;

use crate::record::Record;
use crate::schema::SchemaDiff;
use crate::types::NodeId;

pub use gateway::Gateway;
pub use install::{ensure_all, install, ALL_KINDS};

/// Id handed out when a table has no rows yet
pub const FIRST_ID: NodeId = 1;

/// Outcome of reconciling a record kind with the backing table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    /// Table was absent and has been created (and seeded)
    Created,
    /// Table exists with the expected columns
    Exists,
    /// Table exists with a different layout; left untouched
    Conflict(SchemaDiff),
}

/// Row-level operations the tree and association layers need from a store
pub trait RecordStore {
    /// One plus the largest id in `table`, or `None` when there are no rows
    fn next_id(&mut self, table: &str, extra_where: &str) -> Option<NodeId>;

    /// Fill `record` from the next unread row matching `where_clause`,
    /// in ascending id order. Returns `false` once the rows are exhausted.
    fn fetch_next(&mut self, record: &mut Record, where_clause: &str) -> bool;

    /// Replace the full row of `record`, allocating an id first if needed
    fn upsert(&mut self, record: &mut Record) -> bool;

    /// Delete the row of `record`, optionally narrowed by `extra_where`
    fn delete_self(&mut self, record: &Record, extra_where: &str) -> bool;

    /// `fetch_next` scoped to the record's own id
    fn fetch_self(&mut self, record: &mut Record, extra_where: &str) -> bool {
        let Some(id) = record.id() else {
            tracing::warn!(table = %record.table(), "Attempted fetch of a record without id");
            return false;
        };
        let where_clause = crate::schema::and_where(&format!("id = {}", id), extra_where);
        self.fetch_next(record, &where_clause)
    }
}
