//! Records
//!
//! A record is an ordered bag of named attribute values with an integer `id`.
//! Which attributes a record kind has is declared once, in a static
//! [`RecordSchema`]; everything else (columns, statements, form parsing) is
//! derived from that descriptor.

pub mod kinds;

use crate::schema::{classify_column, ColumnType};
use crate::types::{NodeId, Value};
use std::collections::BTreeMap;
use std::fmt;

pub use kinds::{ACTION, DOMAIN_RULE, FAILURE_MODE, FUNCTION};

/// Column holding the record identity
pub const ID: &str = "id";
/// Column holding the parent pointer of hierarchical records
pub const PARENT_ID: &str = "parentid";
/// Column holding the kind name of the parent record
pub const PARENT_CLASS: &str = "parentclass";
/// Column holding the delimited parent ids of association records
pub const PARENT_LIST: &str = "parentlist";
/// Column holding the sheet (tree root) a failure mode belongs to
pub const SHEET_ID: &str = "sheetid";

/// Initial value a field takes in a freshly defaulted record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Initial {
    Null,
    Integer(i64),
    Text(&'static str),
}

impl Initial {
    pub fn to_value(self) -> Value {
        match self {
            Initial::Null => Value::Null,
            Initial::Integer(v) => Value::Integer(v),
            Initial::Text(s) => Value::Text(s.to_string()),
        }
    }
}

/// One persisted attribute of a record kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub initial: Initial,
}

impl FieldSpec {
    pub const fn null(name: &'static str) -> Self {
        Self {
            name,
            initial: Initial::Null,
        }
    }

    pub const fn int(name: &'static str, value: i64) -> Self {
        Self {
            name,
            initial: Initial::Integer(value),
        }
    }

    pub const fn text(name: &'static str, value: &'static str) -> Self {
        Self {
            name,
            initial: Initial::Text(value),
        }
    }
}

/// Declarative description of a record kind.
///
/// The kind name doubles as the value stored in `parentclass` columns; the
/// table name is the kind name in lower case. `version` is bumped whenever
/// the field list changes so schema drift can be reported precisely.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordSchema {
    pub kind: &'static str,
    pub version: u32,
    pub fields: &'static [FieldSpec],
}

impl RecordSchema {
    pub fn table(&self) -> String {
        self.kind.to_lowercase()
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_index(name).is_some()
    }

    pub fn field_names(&self) -> impl DoubleEndedIterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// True for kinds that carry a single parent pointer
    pub fn is_hierarchical(&self) -> bool {
        self.has_field(PARENT_ID)
    }
}

/// Named form input, e.g. decoded from a submitted HTML form or a JSON map.
pub type FormInput = BTreeMap<String, Value>;

/// A typed bag of named attributes bound to a record kind
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static RecordSchema,
    values: Vec<Value>,
}

impl Record {
    /// Record with every field null
    pub fn empty(schema: &'static RecordSchema) -> Self {
        Self {
            schema,
            values: vec![Value::Null; schema.fields.len()],
        }
    }

    /// Record with every field at its declared initial value
    pub fn with_defaults(schema: &'static RecordSchema) -> Self {
        Self {
            schema,
            values: schema.fields.iter().map(|f| f.initial.to_value()).collect(),
        }
    }

    /// Defaulted record overlaid with the keys present in `form`
    pub fn from_form(schema: &'static RecordSchema, form: &FormInput) -> Self {
        let mut record = Self::with_defaults(schema);
        record.merge_form(form);
        record
    }

    pub fn schema(&self) -> &'static RecordSchema {
        self.schema
    }

    pub fn kind(&self) -> &'static str {
        self.schema.kind
    }

    pub fn table(&self) -> String {
        self.schema.table()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.field_index(name).map(|i| &self.values[i])
    }

    /// Set a field by name. Unknown names are ignored and reported as `false`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> bool {
        match self.schema.field_index(name) {
            Some(i) => {
                self.values[i] = value.into();
                true
            }
            None => {
                tracing::debug!(kind = self.schema.kind, field = name, "Ignoring unknown field");
                false
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schema.has_field(name)
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_text)
    }

    pub fn id(&self) -> Option<NodeId> {
        self.int(ID)
    }

    pub fn set_id(&mut self, id: NodeId) {
        self.set(ID, id);
    }

    /// Parent pointer; null and blank text both mean "root"
    pub fn parent_id(&self) -> Option<NodeId> {
        match self.get(PARENT_ID) {
            Some(v) if !v.is_blank() => v.as_int(),
            _ => None,
        }
    }

    pub fn parent_class(&self) -> Option<&str> {
        self.text(PARENT_CLASS).filter(|s| !s.is_empty())
    }

    /// Field values in declaration order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// (name, value) pairs in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> + '_ {
        self.schema.field_names().zip(self.values.iter())
    }

    /// Overlay the keys present in `form`. Values for integer columns given
    /// as text are parsed; blank text and the literal `NULL` become null.
    pub fn merge_form(&mut self, form: &FormInput) {
        for (key, raw) in form {
            let Some(i) = self.schema.field_index(key) else {
                tracing::debug!(kind = self.schema.kind, field = %key, "Form field not in schema");
                continue;
            };
            let value = normalize_input(raw);
            let value = match (&value, classify_column(key, &self.values[i])) {
                (Value::Text(s), ColumnType::Integer | ColumnType::Key) => {
                    match s.trim().parse::<i64>() {
                        Ok(v) => Value::Integer(v),
                        Err(_) => {
                            tracing::warn!(
                                kind = self.schema.kind,
                                field = %key,
                                value = %s,
                                "Could not convert form value to integer, keeping text"
                            );
                            value
                        }
                    }
                }
                _ => value,
            };
            self.values[i] = value;
        }
    }

    /// Fill fields from a result row. Columns missing from the row are
    /// reported and leave the field untouched.
    pub fn fill_from_row(&mut self, columns: &[String], row: &[Value]) {
        for (i, field) in self.schema.fields.iter().enumerate() {
            match columns.iter().position(|c| c == field.name) {
                Some(col) => self.values[i] = row.get(col).cloned().unwrap_or_default(),
                None => tracing::error!(
                    table = %self.schema.table(),
                    field = field.name,
                    "Result row did not contain column"
                ),
            }
        }
    }

    /// Name → value map, for serialisation by the presentation layer
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.fields()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

fn normalize_input(raw: &Value) -> Value {
    match raw {
        Value::Text(s) if s.trim().is_empty() || s == "NULL" => Value::Null,
        other => other.clone(),
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let contents: Vec<String> = self
            .fields()
            .map(|(name, value)| format!("{}='{}'", name, value))
            .collect();
        write!(f, "{}({})", self.schema.kind, contents.join(", "))
    }
}
