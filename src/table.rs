use std::fmt;

use serde::Serialize;

use crate::schema::SchemaKind;

/// A cell as it came out of the source file, before validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Null => write!(f, ""),
            RawCell::Text(value) => write!(f, "{value}"),
            RawCell::Int(value) => write!(f, "{value}"),
            RawCell::Float(value) => write!(f, "{value}"),
            RawCell::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// Parsed but not yet validated tabular data, rows in source order.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
}

impl RawTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// A typed cell after schema validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }
}

/// A table whose every row conforms to its schema.
#[derive(Debug, Clone)]
pub struct ValidatedTable {
    pub kind: SchemaKind,
    /// Canonical column names, in schema order.
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Value>>,
}

impl ValidatedTable {
    pub fn empty(kind: SchemaKind) -> Self {
        Self {
            kind,
            columns: kind.schema().columns.iter().map(|spec| spec.name).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| *column == name)
    }

    pub fn value<'a>(&self, row: &'a [Value], name: &str) -> Option<&'a Value> {
        self.column_index(name).and_then(|index| row.get(index))
    }
}
