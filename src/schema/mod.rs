//! Schema Mapper
//!
//! Derives table names, column layouts and statement strings from a record's
//! declared field set. Nothing here touches a connection: the store gateway
//! executes what this module produces.

pub mod query;

use crate::record::{Record, RecordSchema, ID};
use crate::types::Value;
use serde::{Deserialize, Serialize};

pub use query::Query;

/// Statement returned when a record kind has no fields to work with
pub const NOOP_SELECT: &str = "SELECT NULL WHERE 0";

/// Name suffixes that mark a column as integer-valued
const INTEGER_SUFFIXES: [&str; 5] = ["id", "count", "_num", "_amt", "_score"];

/// Best-effort column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// The `id` column: unique, non-null integer key
    Key,
    Integer,
    Text,
}

impl ColumnType {
    pub fn sql(self) -> &'static str {
        match self {
            ColumnType::Key => "INT PRIMARY KEY NOT NULL",
            ColumnType::Integer => "INT",
            ColumnType::Text => "VARCHAR",
        }
    }

    /// Map a declared SQLite type back onto the classification
    pub fn from_declared(declared: &str, primary_key: bool) -> Self {
        if primary_key {
            ColumnType::Key
        } else if declared.to_ascii_uppercase().contains("INT") {
            ColumnType::Integer
        } else {
            ColumnType::Text
        }
    }
}

/// Classify a column by its name, falling back to the shape of its value
pub fn classify_column(name: &str, value: &Value) -> ColumnType {
    let lower = name.to_ascii_lowercase();
    if lower == ID {
        return ColumnType::Key;
    }
    if INTEGER_SUFFIXES.iter().any(|s| lower.ends_with(s)) || matches!(value, Value::Integer(_)) {
        ColumnType::Integer
    } else {
        ColumnType::Text
    }
}

/// Column name and type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

/// Expected column layout of a record kind.
///
/// A null value falls back to the declared initial value so that an empty
/// record and a defaulted one map to the same layout.
pub fn column_defs(record: &Record) -> Vec<ColumnDef> {
    record
        .schema()
        .fields
        .iter()
        .zip(record.values())
        .map(|(field, value)| {
            let probe = if value.is_null() {
                field.initial.to_value()
            } else {
                value.clone()
            };
            ColumnDef {
                name: field.name.to_string(),
                ty: classify_column(field.name, &probe),
            }
        })
        .collect()
}

/// Expected layout for a schema, independent of any record's values
pub fn schema_columns(schema: &'static RecordSchema) -> Vec<ColumnDef> {
    column_defs(&Record::with_defaults(schema))
}

/// `a, b, c` column list in declaration order
pub fn column_list(record: &Record) -> String {
    record.schema().field_names().collect::<Vec<_>>().join(", ")
}

/// `a INT,b VARCHAR` body of a CREATE TABLE statement
pub fn column_types(record: &Record) -> String {
    column_defs(record)
        .iter()
        .map(|c| format!("{} {}", c.name, c.ty.sql()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn create_table(record: &Record) -> String {
    if record.schema().fields.is_empty() {
        return NOOP_SELECT.to_string();
    }
    format!("CREATE TABLE {}({})", record.table(), column_types(record))
}

pub fn create_unique_index(record: &Record) -> String {
    let table = record.table();
    format!("CREATE UNIQUE INDEX only_one_id_on_{table} ON {table} (id)")
}

pub fn drop_table(record: &Record) -> String {
    format!("DROP TABLE IF EXISTS {}", record.table())
}

/// SELECT over all declared columns with optional filter and ordering
pub fn select(record: &Record, where_clause: &str, order_by: &str) -> String {
    if record.schema().fields.is_empty() {
        return NOOP_SELECT.to_string();
    }
    Query::select(&column_list(record))
        .from(&record.table())
        .filter(where_clause)
        .order_by(order_by)
        .build()
}

pub fn select_max_id(table: &str, extra_where: &str) -> String {
    Query::select("max(id)")
        .from(table)
        .filter(extra_where)
        .build()
}

/// Full-row replace with one positional parameter per field
pub fn replace(record: &Record) -> String {
    let count = record.schema().fields.len();
    if count == 0 {
        return NOOP_SELECT.to_string();
    }
    let placeholders = vec!["?"; count].join(", ");
    Query::new("REPLACE INTO")
        .what(&format!("{}({})", record.table(), column_list(record)))
        .values(&placeholders)
        .build()
}

/// DELETE of the row with the given id, optionally narrowed further
pub fn delete(record: &Record, id: i64, extra_where: &str) -> String {
    Query::new("DELETE")
        .from(&record.table())
        .filter(&and_where(&format!("id = {}", id), extra_where))
        .build()
}

/// Combine two predicates, either of which may be empty
pub fn and_where(first: &str, second: &str) -> String {
    match (first.trim().is_empty(), second.trim().is_empty()) {
        (true, true) => String::new(),
        (false, true) => first.to_string(),
        (true, false) => second.to_string(),
        (false, false) => format!("{} AND ({})", first, second),
    }
}

/// Structural difference between an expected and an existing table layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDiff {
    pub table: String,
    pub version: u32,
    /// Expected but absent from the table
    pub missing: Vec<ColumnDef>,
    /// Present in the table but not expected
    pub unexpected: Vec<ColumnDef>,
    /// Same name, different type: (expected, existing)
    pub retyped: Vec<(ColumnDef, ColumnDef)>,
}

impl SchemaDiff {
    pub fn compute(
        schema: &'static RecordSchema,
        expected: &[ColumnDef],
        existing: &[ColumnDef],
    ) -> Self {
        let mut diff = SchemaDiff {
            table: schema.table(),
            version: schema.version,
            ..Default::default()
        };
        for want in expected {
            match existing.iter().find(|c| c.name == want.name) {
                None => diff.missing.push(want.clone()),
                Some(have) if have.ty != want.ty => {
                    diff.retyped.push((want.clone(), have.clone()))
                }
                Some(_) => {}
            }
        }
        for have in existing {
            if !expected.iter().any(|c| c.name == have.name) {
                diff.unexpected.push(have.clone());
            }
        }
        diff
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.retyped.is_empty()
    }

    /// Only columns to add; nothing to drop or retype
    pub fn is_additive(&self) -> bool {
        self.unexpected.is_empty() && self.retyped.is_empty()
    }

    /// Pairs of (unexpected, missing) columns of the same type, which may be
    /// renames. Informational only.
    pub fn rename_candidates(&self) -> Vec<(&ColumnDef, &ColumnDef)> {
        let mut used = vec![false; self.missing.len()];
        let mut pairs = Vec::new();
        for old in &self.unexpected {
            if let Some(i) = (0..self.missing.len())
                .find(|&i| !used[i] && self.missing[i].ty == old.ty)
            {
                used[i] = true;
                pairs.push((old, &self.missing[i]));
            }
        }
        pairs
    }
}
