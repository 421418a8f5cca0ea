//! SQLite gateway

use super::{RecordStore, TableStatus, FIRST_ID};
use crate::error::StoreError;
use crate::record::Record;
use crate::schema::{self, ColumnDef, ColumnType, SchemaDiff};
use crate::types::{NodeId, Value};
use rusqlite::Connection;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Result rows of the last SELECT, consumed front to back
struct Cursor {
    query: String,
    columns: Vec<String>,
    rows: VecDeque<Vec<Value>>,
}

/// Session-scoped owner of the database connection.
///
/// One gateway is opened per inbound operation and dropped (or closed) at its
/// end. Every write runs in autocommit mode, so each row change is committed
/// as soon as its statement succeeds.
pub struct Gateway {
    conn: Connection,
    cursor: Option<Cursor>,
    last_statement: String,
}

impl Gateway {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self::with_connection(conn))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::with_connection(Connection::open_in_memory()?))
    }

    fn with_connection(conn: Connection) -> Self {
        Self {
            conn,
            cursor: None,
            last_statement: String::new(),
        }
    }

    /// Close the connection, reporting a failed close
    pub fn close(self) -> bool {
        match self.conn.close() {
            Ok(()) => true,
            Err((_, e)) => {
                error!(error = %e, "Failed to close database connection");
                false
            }
        }
    }

    /// Last statement handed to SQLite, for diagnostics
    pub fn last_statement(&self) -> &str {
        &self.last_statement
    }

    fn report(&self, operation: &str, err: &StoreError) {
        error!(
            operation,
            statement = %self.last_statement,
            kind = err.kind(),
            error = %err,
            "Store operation failed"
        );
    }

    fn run_select(&mut self, query: &str) -> Result<Cursor, StoreError> {
        self.last_statement = query.to_string();
        let mut stmt = self.conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let count = columns.len();
        let rows = stmt
            .query_map([], |row| {
                (0..count)
                    .map(|i| row.get_ref(i).map(Value::from))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<VecDeque<Vec<Value>>>>()?;
        Ok(Cursor {
            query: query.to_string(),
            columns,
            rows,
        })
    }

    fn try_next_id(&mut self, table: &str, extra_where: &str) -> Result<Option<NodeId>, StoreError> {
        let query = schema::select_max_id(table, extra_where);
        self.cursor = None;
        self.last_statement = query.clone();
        let max: Option<i64> = self.conn.query_row(&query, [], |row| row.get(0))?;
        Ok(max.map(|m| m + 1))
    }

    fn try_upsert(&mut self, record: &mut Record) -> Result<(), StoreError> {
        if record.schema().fields.is_empty() {
            return Err(StoreError::NoFields {
                table: record.table(),
            });
        }
        if record.id().is_none() {
            let id = self.try_next_id(&record.table(), "")?.unwrap_or(FIRST_ID);
            record.set_id(id);
        }
        let query = schema::replace(record);
        self.cursor = None;
        self.last_statement = query.clone();
        self.conn
            .execute(&query, rusqlite::params_from_iter(record.values().iter()))?;
        Ok(())
    }

    fn try_delete(&mut self, record: &Record, extra_where: &str) -> Result<usize, StoreError> {
        let id = record.id().ok_or_else(|| StoreError::MissingId {
            table: record.table(),
        })?;
        let query = schema::delete(record, id, extra_where);
        self.cursor = None;
        self.last_statement = query.clone();
        Ok(self.conn.execute(&query, [])?)
    }

    fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        let query = "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1";
        self.last_statement = query.to_string();
        let count: i64 = self.conn.query_row(query, [table], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Column layout of an existing table as recorded in the catalog
    pub fn existing_columns(&mut self, table: &str) -> Option<Vec<ColumnDef>> {
        match self.try_existing_columns(table) {
            Ok(columns) => Some(columns),
            Err(e) => {
                self.report("existing_columns", &e);
                None
            }
        }
    }

    fn try_existing_columns(&mut self, table: &str) -> Result<Vec<ColumnDef>, StoreError> {
        let query = format!("PRAGMA table_info({})", table);
        self.cursor = None;
        self.last_statement = query.clone();
        let mut stmt = self.conn.prepare(&query)?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let declared: String = row.get(2)?;
                let pk: i64 = row.get(5)?;
                Ok(ColumnDef {
                    name,
                    ty: ColumnType::from_declared(&declared, pk > 0),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    fn try_create(&mut self, record: &Record, seed: &[Record], drop_first: bool) -> Result<(), StoreError> {
        if record.schema().fields.is_empty() {
            return Err(StoreError::NoFields {
                table: record.table(),
            });
        }
        self.cursor = None;
        let mut script = String::new();
        if drop_first {
            script.push_str(&schema::drop_table(record));
            script.push_str(";\n");
        }
        script.push_str(&schema::create_table(record));
        script.push_str(";\n");
        script.push_str(&schema::create_unique_index(record));
        script.push(';');
        self.last_statement = script.clone();

        let tx = self.conn.transaction()?;
        tx.execute_batch(&script)?;
        for row in seed {
            let query = schema::replace(row);
            tx.execute(&query, rusqlite::params_from_iter(row.values().iter()))?;
        }
        tx.commit()?;
        Ok(())
    }

    fn try_ensure_table(&mut self, record: &Record, seed: &[Record]) -> Result<TableStatus, StoreError> {
        let table = record.table();
        if !self.table_exists(&table)? {
            self.try_create(record, seed, false)?;
            info!(table = %table, seeded = seed.len(), "Created table");
            return Ok(TableStatus::Created);
        }
        let existing = self.try_existing_columns(&table)?;
        let diff = SchemaDiff::compute(record.schema(), &schema::column_defs(record), &existing);
        if diff.is_empty() {
            return Ok(TableStatus::Exists);
        }
        warn!(
            table = %table,
            version = diff.version,
            missing = ?diff.missing,
            unexpected = ?diff.unexpected,
            retyped = ?diff.retyped,
            renames = ?diff.rename_candidates(),
            "Table layout differs from the record kind; manual migration required"
        );
        Ok(TableStatus::Conflict(diff))
    }

    /// Reconcile the table of `record` with its declared layout.
    ///
    /// An absent table is created and seeded with `seed`. A present table
    /// with a different layout is reported and never altered here.
    pub fn ensure_table(&mut self, record: &Record, seed: &[Record]) -> Option<TableStatus> {
        match self.try_ensure_table(record, seed) {
            Ok(status) => Some(status),
            Err(e) => {
                self.report("ensure_table", &e);
                None
            }
        }
    }

    /// Drop and recreate the table of `record`, then insert `seed`.
    /// Destroys existing rows.
    pub fn recreate_table(&mut self, record: &Record, seed: &[Record]) -> bool {
        match self.try_create(record, seed, true) {
            Ok(()) => {
                info!(table = %record.table(), seeded = seed.len(), "Recreated table");
                true
            }
            Err(e) => {
                self.report("recreate_table", &e);
                false
            }
        }
    }

    /// Apply the additive part of a layout difference (missing columns only).
    ///
    /// Refuses, and changes nothing, when columns would have to be dropped,
    /// retyped, or when the key column itself is missing.
    pub fn migrate(&mut self, record: &Record) -> bool {
        match self.try_migrate(record) {
            Ok(applied) => applied,
            Err(e) => {
                self.report("migrate", &e);
                false
            }
        }
    }

    fn try_migrate(&mut self, record: &Record) -> Result<bool, StoreError> {
        let table = record.table();
        if !self.table_exists(&table)? {
            warn!(table = %table, "Nothing to migrate: table does not exist");
            return Ok(false);
        }
        let existing = self.try_existing_columns(&table)?;
        let diff = SchemaDiff::compute(record.schema(), &schema::column_defs(record), &existing);
        if diff.is_empty() {
            return Ok(true);
        }
        if !diff.is_additive() || diff.missing.iter().any(|c| c.ty == ColumnType::Key) {
            warn!(
                table = %table,
                unexpected = ?diff.unexpected,
                retyped = ?diff.retyped,
                "Refusing non-additive migration"
            );
            return Err(StoreError::TableConflict { table });
        }
        let tx = self.conn.transaction()?;
        for column in &diff.missing {
            let query = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.ty.sql());
            self.last_statement = query.clone();
            tx.execute(&query, [])?;
        }
        tx.commit()?;
        info!(table = %table, added = diff.missing.len(), "Migrated table");
        Ok(true)
    }
}

impl RecordStore for Gateway {
    fn next_id(&mut self, table: &str, extra_where: &str) -> Option<NodeId> {
        match self.try_next_id(table, extra_where) {
            Ok(next) => next,
            Err(e) => {
                self.report("next_id", &e);
                None
            }
        }
    }

    fn fetch_next(&mut self, record: &mut Record, where_clause: &str) -> bool {
        let query = schema::select(record, where_clause, "id ASC");
        let reuse = self.cursor.as_ref().is_some_and(|c| c.query == query);
        if !reuse {
            match self.run_select(&query) {
                Ok(cursor) => self.cursor = Some(cursor),
                Err(e) => {
                    self.cursor = None;
                    self.report("fetch_next", &e);
                    return false;
                }
            }
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return false;
        };
        match cursor.rows.pop_front() {
            Some(row) => {
                record.fill_from_row(&cursor.columns, &row);
                true
            }
            None => {
                self.cursor = None;
                false
            }
        }
    }

    fn upsert(&mut self, record: &mut Record) -> bool {
        match self.try_upsert(record) {
            Ok(()) => true,
            Err(e) => {
                self.report("upsert", &e);
                false
            }
        }
    }

    fn delete_self(&mut self, record: &Record, extra_where: &str) -> bool {
        if record.id().is_none() {
            warn!(table = %record.table(), "Attempted delete on a record without id");
            return false;
        }
        match self.try_delete(record, extra_where) {
            Ok(removed) => {
                if removed == 0 {
                    debug!(table = %record.table(), id = ?record.id(), "Delete matched no row");
                }
                true
            }
            Err(e) => {
                self.report("delete_self", &e);
                false
            }
        }
    }
}
