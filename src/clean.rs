use std::collections::HashSet;

use crate::domain::{CommentRow, DataRow, MetadataRow, ReferenceRow, TableKey};
use crate::error::PipelineError;
use crate::schema::SchemaKind;
use crate::table::{ValidatedTable, Value};

/// Sentinel entry-index values marking known-bad source rows.
const DROPPED_ENTRY_MARKERS: [&str; 2] = ["duplicate", "error"];

/// Clean the table comments: fill the spellcheck flag, strip placeholder
/// hyphens, and re-establish the table key as a unique row identifier.
pub fn clean_comments(table: &ValidatedTable) -> Result<Vec<CommentRow>, PipelineError> {
    expect_kind(table, SchemaKind::OpenTecrComment)?;
    let mut rows = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        rows.push(CommentRow {
            key: table_key(table, row)?,
            was_spellchecked: opt_int(table, row, "was_spellchecked").unwrap_or(0) != 0,
            primary_comment: opt_text(table, row, "primary_comment").map(strip_hyphens),
        });
    }
    assert_unique_keys(rows.iter().map(|row| row.key))?;
    Ok(rows)
}

/// Clean the table metadata: strip placeholder markers from the method and
/// buffer descriptions, trim the reaction string, and re-establish the table
/// key as a unique row identifier.
pub fn clean_metadata(table: &ValidatedTable) -> Result<Vec<MetadataRow>, PipelineError> {
    expect_kind(table, SchemaKind::OpenTecrMetadata)?;
    let mut rows = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        rows.push(MetadataRow {
            key: table_key(table, row)?,
            reaction: req_text(table, row, "reaction")?.trim().to_string(),
            reference_code: req_text(table, row, "reference_code")?.to_string(),
            secondary_comment: opt_text(table, row, "secondary_comment"),
            method: opt_text(table, row, "method").map(strip_hyphens),
            buffer: opt_text(table, row, "buffer")
                .map(|value| strip_hyphens(value).replace("none", "")),
        });
    }
    assert_unique_keys(rows.iter().map(|row| row.key))?;
    Ok(rows)
}

/// Clean the measurement data: remove rows flagged `duplicate` or `error`
/// and coerce the remaining entry indices to integers.
///
/// Several entries share one table key here; the (key, entry) pair is
/// asserted unique by the denormalizing join instead.
pub fn clean_data(table: &ValidatedTable) -> Result<Vec<DataRow>, PipelineError> {
    expect_kind(table, SchemaKind::OpenTecrData)?;
    let mut rows = Vec::with_capacity(table.row_count());
    for row in &table.rows {
        let entry = opt_text(table, row, "entry_index");
        if entry
            .as_deref()
            .is_some_and(|value| DROPPED_ENTRY_MARKERS.contains(&value))
        {
            continue;
        }
        let entry_index = entry
            .ok_or_else(|| PipelineError::Parse("data row without an entry index".to_string()))?
            .parse::<i64>()
            .map_err(|err| PipelineError::Parse(format!("entry index: {err}")))?;
        rows.push(DataRow {
            key: table_key(table, row)?,
            entry_index,
            id: opt_text(table, row, "id"),
            temperature: req_float(table, row, "temperature")?,
            ionic_strength: opt_float(table, row, "ionic_strength"),
            hydrogen_potential: opt_float(table, row, "hydrogen_potential"),
            magnesium_potential: opt_float(table, row, "magnesium_potential"),
            apparent_equilibrium: opt_float(table, row, "apparent_equilibrium"),
            additional_info: opt_text(table, row, "additional_info"),
        });
    }
    Ok(rows)
}

/// Extract the references table into typed rows.
pub fn extract_references(table: &ValidatedTable) -> Result<Vec<ReferenceRow>, PipelineError> {
    expect_kind(table, SchemaKind::OpenTecrReference)?;
    table
        .rows
        .iter()
        .map(|row| {
            Ok(ReferenceRow {
                reference_code: req_text(table, row, "reference_code")?.to_string(),
                pmid: opt_text(table, row, "pmid"),
                doi: opt_text(table, row, "doi"),
            })
        })
        .collect()
}

fn expect_kind(table: &ValidatedTable, expected: SchemaKind) -> Result<(), PipelineError> {
    if table.kind != expected {
        return Err(PipelineError::Config(format!(
            "expected a {} table, got {}",
            expected.name(),
            table.kind.name()
        )));
    }
    Ok(())
}

fn table_key(table: &ValidatedTable, row: &[Value]) -> Result<TableKey, PipelineError> {
    Ok(TableKey {
        part: req_int(table, row, "part")?,
        page: req_int(table, row, "page")?,
        column: req_int(table, row, "column")?,
        table_index: req_int(table, row, "table_index")?,
    })
}

fn assert_unique_keys(keys: impl Iterator<Item = TableKey>) -> Result<(), PipelineError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(PipelineError::DuplicateKey(key.to_string()));
        }
    }
    Ok(())
}

fn strip_hyphens(value: String) -> String {
    value.replace('-', "")
}

fn req_int(table: &ValidatedTable, row: &[Value], name: &str) -> Result<i64, PipelineError> {
    table
        .value(row, name)
        .and_then(Value::as_int)
        .ok_or_else(|| PipelineError::Parse(format!("missing integer in column {name}")))
}

fn opt_int(table: &ValidatedTable, row: &[Value], name: &str) -> Option<i64> {
    table.value(row, name).and_then(Value::as_int)
}

fn req_float(table: &ValidatedTable, row: &[Value], name: &str) -> Result<f64, PipelineError> {
    table
        .value(row, name)
        .and_then(Value::as_float)
        .ok_or_else(|| PipelineError::Parse(format!("missing float in column {name}")))
}

fn opt_float(table: &ValidatedTable, row: &[Value], name: &str) -> Option<f64> {
    table.value(row, name).and_then(Value::as_float)
}

fn req_text<'a>(
    table: &ValidatedTable,
    row: &'a [Value],
    name: &str,
) -> Result<&'a str, PipelineError> {
    table
        .value(row, name)
        .and_then(Value::as_text)
        .ok_or_else(|| PipelineError::Parse(format!("missing text in column {name}")))
}

fn opt_text(table: &ValidatedTable, row: &[Value], name: &str) -> Option<String> {
    table
        .value(row, name)
        .and_then(Value::as_text)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn comment_table(rows: Vec<Vec<Value>>) -> ValidatedTable {
        ValidatedTable {
            kind: SchemaKind::OpenTecrComment,
            columns: vec![
                "part",
                "page",
                "column",
                "table_index",
                "was_spellchecked",
                "primary_comment",
            ],
            rows,
        }
    }

    fn comment_row(part: i64, spellchecked: Value, comment: Value) -> Vec<Value> {
        vec![
            Value::Int(part),
            Value::Int(4),
            Value::Int(1),
            Value::Int(1),
            spellchecked,
            comment,
        ]
    }

    #[test]
    fn spellcheck_flag_fills_missing_with_false() {
        let table = comment_table(vec![
            comment_row(1, Value::Null, Value::Text("-".to_string())),
            comment_row(2, Value::Int(1), Value::Null),
        ]);
        let rows = clean_comments(&table).unwrap();
        assert!(!rows[0].was_spellchecked);
        assert!(rows[1].was_spellchecked);
        assert_eq!(rows[0].primary_comment.as_deref(), Some(""));
        assert_eq!(rows[1].primary_comment, None);
    }

    #[test]
    fn duplicate_keys_after_cleaning_are_fatal() {
        let table = comment_table(vec![
            comment_row(1, Value::Null, Value::Null),
            comment_row(1, Value::Null, Value::Null),
        ]);
        let err = clean_comments(&table).unwrap_err();
        assert_matches!(err, PipelineError::DuplicateKey(_));
    }

    fn data_table(entries: Vec<Value>) -> ValidatedTable {
        ValidatedTable {
            kind: SchemaKind::OpenTecrData,
            columns: vec![
                "part",
                "page",
                "column",
                "table_index",
                "entry_index",
                "id",
                "temperature",
                "ionic_strength",
                "hydrogen_potential",
                "magnesium_potential",
                "apparent_equilibrium",
                "additional_info",
            ],
            rows: entries
                .into_iter()
                .map(|entry| {
                    vec![
                        Value::Int(1),
                        Value::Int(4),
                        Value::Int(1),
                        Value::Int(1),
                        entry,
                        Value::Null,
                        Value::Float(298.15),
                        Value::Null,
                        Value::Float(7.0),
                        Value::Null,
                        Value::Float(0.5),
                        Value::Null,
                    ]
                })
                .collect(),
        }
    }

    #[test]
    fn sentinel_entries_are_dropped_before_coercion() {
        let table = data_table(vec![
            Value::Text("1".to_string()),
            Value::Text("duplicate".to_string()),
            Value::Text("error".to_string()),
            Value::Text("2".to_string()),
        ]);
        let rows = clean_data(&table).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].entry_index, 1);
        assert_eq!(rows[1].entry_index, 2);
    }

    #[test]
    fn non_numeric_entry_index_is_fatal() {
        let table = data_table(vec![Value::Text("about twelve".to_string())]);
        let err = clean_data(&table).unwrap_err();
        assert_matches!(err, PipelineError::Parse(_));
    }

    #[test]
    fn metadata_cleaning_strips_markers() {
        let table = ValidatedTable {
            kind: SchemaKind::OpenTecrMetadata,
            columns: vec![
                "part",
                "page",
                "column",
                "table_index",
                "reaction",
                "reference_code",
                "secondary_comment",
                "method",
                "buffer",
            ],
            rows: vec![vec![
                Value::Int(1),
                Value::Int(4),
                Value::Int(1),
                Value::Int(1),
                Value::Text(" ATP + H2O = ADP + Phosphate ".to_string()),
                Value::Text("bur55".to_string()),
                Value::Null,
                Value::Text("-".to_string()),
                Value::Text("none".to_string()),
            ]],
        };
        let rows = clean_metadata(&table).unwrap();
        assert_eq!(rows[0].reaction, "ATP + H2O = ADP + Phosphate");
        assert_eq!(rows[0].method.as_deref(), Some(""));
        assert_eq!(rows[0].buffer.as_deref(), Some(""));
    }
}
