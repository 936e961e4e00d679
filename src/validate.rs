use std::collections::HashMap;

use serde::Serialize;

use crate::error::PipelineError;
use crate::schema::{ColumnSpec, SchemaKind, SemanticType, StrictMode};
use crate::table::{RawCell, RawTable, ValidatedTable, Value};

/// One row-level schema violation, with the full offending row for the log.
#[derive(Debug, Clone, Serialize)]
pub struct Violation {
    pub row_index: usize,
    pub column: Option<&'static str>,
    pub reason: String,
    pub contents: Vec<String>,
}

/// Outcome record of validating one table.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub schema: &'static str,
    pub row_count: usize,
    pub column_count: usize,
    pub dropped_rows: usize,
    pub violations: Vec<Violation>,
}

/// Validate a raw table against the schema registry entry `kind`.
///
/// Violations are collected across all rows before any row is dropped, so a
/// single report covers everything wrong with the input. Offending rows are
/// excluded from the result and logged; they never abort the run. Structural
/// problems (missing or, in strict mode, unexpected columns) cannot be
/// repaired row-wise and are returned as errors instead.
pub fn validate(
    raw: &RawTable,
    kind: SchemaKind,
) -> Result<(ValidatedTable, ValidationReport), PipelineError> {
    let schema = kind.schema();

    if raw.rows.is_empty() {
        let table = ValidatedTable::empty(kind);
        let report = ValidationReport {
            schema: schema.name,
            row_count: 0,
            column_count: table.column_count(),
            dropped_rows: 0,
            violations: Vec::new(),
        };
        return Ok((table, report));
    }

    let indices = resolve_columns(raw, kind)?;

    // First pass: evaluate every field constraint on every row.
    let mut violations = Vec::new();
    let mut converted: Vec<Option<Vec<Value>>> = Vec::with_capacity(raw.rows.len());
    for (row_index, row) in raw.rows.iter().enumerate() {
        let mut values = Vec::with_capacity(schema.columns.len());
        let mut failed = false;
        for (spec, source_index) in schema.columns.iter().zip(&indices) {
            let cell = row.get(*source_index).unwrap_or(&RawCell::Null);
            match convert(cell, spec) {
                Ok(value) => values.push(value),
                Err(reason) => {
                    failed = true;
                    violations.push(Violation {
                        row_index,
                        column: Some(spec.name),
                        reason,
                        contents: render_row(row),
                    });
                }
            }
        }
        converted.push(if failed { None } else { Some(values) });
    }

    // Second pass: composite unique key over the rows that passed.
    if !schema.unique.is_empty() {
        let key_indices: Vec<usize> = schema
            .unique
            .iter()
            .filter_map(|name| schema.columns.iter().position(|spec| spec.name == *name))
            .collect();
        let mut seen: HashMap<String, Vec<usize>> = HashMap::new();
        for (row_index, values) in converted.iter().enumerate() {
            if let Some(values) = values {
                let key = render_key(values, &key_indices);
                seen.entry(key).or_default().push(row_index);
            }
        }
        for (key, rows) in seen {
            if rows.len() > 1 {
                for row_index in rows {
                    violations.push(Violation {
                        row_index,
                        column: None,
                        reason: format!("duplicate unique key ({key})"),
                        contents: render_row(&raw.rows[row_index]),
                    });
                    converted[row_index] = None;
                }
            }
        }
    }

    if !violations.is_empty() {
        violations.sort_by_key(|violation| violation.row_index);
        tracing::error!(
            schema = schema.name,
            count = violations.len(),
            "schema violations, dropping offending rows"
        );
        for violation in &violations {
            tracing::error!(
                row = violation.row_index,
                column = violation.column.unwrap_or("<unique key>"),
                reason = %violation.reason,
                contents = %violation.contents.join("\t"),
                "offending row"
            );
        }
    }

    let rows: Vec<Vec<Value>> = converted.into_iter().flatten().collect();
    let dropped_rows = raw.rows.len() - rows.len();
    let table = ValidatedTable {
        kind,
        columns: schema.columns.iter().map(|spec| spec.name).collect(),
        rows,
    };
    let report = ValidationReport {
        schema: schema.name,
        row_count: table.row_count(),
        column_count: table.column_count(),
        dropped_rows,
        violations,
    };
    Ok((table, report))
}

/// Map each declared column to its index in the source header row.
fn resolve_columns(raw: &RawTable, kind: SchemaKind) -> Result<Vec<usize>, PipelineError> {
    let schema = kind.schema();

    if matches!(schema.strict, StrictMode::Reject) {
        if raw.headers.len() != schema.columns.len() {
            return Err(PipelineError::ColumnCount {
                schema: schema.name.to_string(),
                expected: schema.columns.len(),
                actual: raw.headers.len(),
            });
        }
        if let Some(header) = raw.headers.iter().find(|header| {
            schema
                .columns
                .iter()
                .all(|spec| spec.source_name() != header.as_str())
        }) {
            return Err(PipelineError::UnexpectedColumn {
                schema: schema.name.to_string(),
                column: header.clone(),
            });
        }
    }

    schema
        .columns
        .iter()
        .map(|spec| {
            raw.headers
                .iter()
                .position(|header| header.as_str() == spec.source_name())
                .ok_or_else(|| PipelineError::MissingColumn {
                    schema: schema.name.to_string(),
                    column: spec.source_name().to_string(),
                })
        })
        .collect()
}

fn convert(cell: &RawCell, spec: &ColumnSpec) -> Result<Value, String> {
    let cell = match cell {
        RawCell::Text(text) if text.is_empty() => &RawCell::Null,
        other => other,
    };

    if matches!(cell, RawCell::Null) {
        return if spec.nullable {
            Ok(Value::Null)
        } else {
            Err("null in non-nullable column".to_string())
        };
    }

    match spec.ty {
        SemanticType::Text => match cell {
            RawCell::Text(text) => Ok(Value::Text(text.clone())),
            other if spec.coerce => Ok(Value::Text(render_numeric(other))),
            other => Err(format!("expected text, found {other}")),
        },
        SemanticType::Integer => match cell {
            RawCell::Int(value) => Ok(Value::Int(*value)),
            // Spreadsheet numeric cells always arrive as floats.
            RawCell::Float(value) if value.fract() == 0.0 => Ok(Value::Int(*value as i64)),
            RawCell::Float(value) => Err(format!("expected integer, found {value}")),
            RawCell::Bool(value) if spec.coerce => Ok(Value::Int(i64::from(*value))),
            RawCell::Text(text) if spec.coerce => parse_int(text),
            other => Err(format!("expected integer, found {other}")),
        },
        SemanticType::Float => match cell {
            RawCell::Float(value) => Ok(Value::Float(*value)),
            RawCell::Int(value) => Ok(Value::Float(*value as f64)),
            RawCell::Text(text) if spec.coerce => text
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("expected float, found {text:?}")),
            other => Err(format!("expected float, found {other}")),
        },
        SemanticType::Boolean => match cell {
            RawCell::Bool(value) => Ok(Value::Bool(*value)),
            RawCell::Int(value) if spec.coerce && (*value == 0 || *value == 1) => {
                Ok(Value::Bool(*value == 1))
            }
            RawCell::Float(value) if spec.coerce && (*value == 0.0 || *value == 1.0) => {
                Ok(Value::Bool(*value == 1.0))
            }
            RawCell::Text(text) if spec.coerce => parse_bool(text),
            other => Err(format!("expected boolean, found {other}")),
        },
    }
}

fn parse_int(text: &str) -> Result<Value, String> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Ok(Value::Int(value));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => Ok(Value::Int(value as i64)),
        _ => Err(format!("expected integer, found {text:?}")),
    }
}

fn parse_bool(text: &str) -> Result<Value, String> {
    match text.trim() {
        "true" | "True" | "TRUE" | "T" | "1" => Ok(Value::Bool(true)),
        "false" | "False" | "FALSE" | "F" | "0" => Ok(Value::Bool(false)),
        other => Err(format!("expected boolean, found {other:?}")),
    }
}

fn render_numeric(cell: &RawCell) -> String {
    match cell {
        // Integral floats from spreadsheet cells render without the
        // fractional part so that `42.0` coerces to the text `42`.
        RawCell::Float(value) if value.fract() == 0.0 => format!("{}", *value as i64),
        other => other.to_string(),
    }
}

fn render_row(row: &[RawCell]) -> Vec<String> {
    row.iter().map(RawCell::to_string).collect()
}

fn render_key(values: &[Value], key_indices: &[usize]) -> String {
    key_indices
        .iter()
        .filter_map(|index| values.get(*index))
        .map(|value| match value {
            Value::Null => String::new(),
            Value::Text(text) => text.clone(),
            Value::Int(value) => value.to_string(),
            Value::Float(value) => value.to_string(),
            Value::Bool(value) => value.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
