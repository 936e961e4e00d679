use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;

use crate::domain::{CommentRow, DataRow, DenormalizedRow, MetadataRow, ReferenceRow, TableInfoRow};
use crate::error::PipelineError;

/// Join two tables whose keys must match pairwise.
///
/// Both sides must be unique by key and every key must appear on both sides;
/// the result holds exactly `left.len() == right.len()` pairs. A duplicate
/// key or an unmatched row is an upstream data-integrity failure and aborts
/// the run.
pub fn join_one_to_one<'a, L, R, K>(
    left: &'a [L],
    right: &'a [R],
    left_key: impl Fn(&L) -> K,
    right_key: impl Fn(&R) -> K,
) -> Result<Vec<(&'a L, &'a R)>, PipelineError>
where
    K: Eq + Hash + fmt::Display,
{
    let mut index = HashMap::with_capacity(right.len());
    for row in right {
        let key = right_key(row);
        let rendered = key.to_string();
        if index.insert(key, row).is_some() {
            return Err(PipelineError::DuplicateKey(rendered));
        }
    }

    let mut seen = HashSet::with_capacity(left.len());
    let mut result = Vec::with_capacity(left.len());
    for row in left {
        let key = left_key(row);
        if let Some(other) = index.get(&key) {
            result.push((row, *other));
        }
        if !seen.insert(key) {
            return Err(PipelineError::DuplicateKey(left_key(row).to_string()));
        }
    }

    if result.len() != left.len() {
        return Err(PipelineError::Cardinality {
            expected: left.len(),
            actual: result.len(),
        });
    }
    if result.len() != right.len() {
        return Err(PipelineError::Cardinality {
            expected: right.len(),
            actual: result.len(),
        });
    }
    Ok(result)
}

/// Left-outer join of a many side against a one side.
///
/// The one side must be unique by key. Every many-side row is retained;
/// unmatched keys carry `None`. The result length always equals the many
/// side's length, so fan-out is impossible by construction.
pub fn join_left_many_to_one<'a, M, O, K>(
    many: &'a [M],
    one: &'a [O],
    many_key: impl Fn(&M) -> K,
    one_key: impl Fn(&O) -> K,
) -> Result<Vec<(&'a M, Option<&'a O>)>, PipelineError>
where
    K: Eq + Hash + fmt::Display,
{
    let mut index = HashMap::with_capacity(one.len());
    for row in one {
        let key = one_key(row);
        let rendered = key.to_string();
        if index.insert(key, row).is_some() {
            return Err(PipelineError::DuplicateKey(rendered));
        }
    }

    let result: Vec<(&M, Option<&O>)> = many
        .iter()
        .map(|row| (row, index.get(&many_key(row)).copied()))
        .collect();

    if result.len() != many.len() {
        return Err(PipelineError::Cardinality {
            expected: many.len(),
            actual: result.len(),
        });
    }
    Ok(result)
}

/// Join cleaned comments 1:1 with cleaned metadata on the table key, then
/// attach publication references m:1 on the reference code.
pub fn table_info(
    comments: &[CommentRow],
    metadata: &[MetadataRow],
    references: &[ReferenceRow],
) -> Result<Vec<TableInfoRow>, PipelineError> {
    let primary = join_one_to_one(comments, metadata, |row| row.key, |row| row.key)?;

    let joined = join_left_many_to_one(
        &primary,
        references,
        |(_, metadata)| metadata.reference_code.clone(),
        |reference| reference.reference_code.clone(),
    )?;

    let mut seen = HashSet::with_capacity(joined.len());
    let mut rows = Vec::with_capacity(joined.len());
    for ((comment, metadata), reference) in joined {
        if !seen.insert(comment.key) {
            return Err(PipelineError::DuplicateKey(comment.key.to_string()));
        }
        rows.push(TableInfoRow {
            key: comment.key,
            was_spellchecked: comment.was_spellchecked,
            primary_comment: comment.primary_comment.clone(),
            reaction: metadata.reaction.clone(),
            reference_code: metadata.reference_code.clone(),
            secondary_comment: metadata.secondary_comment.clone(),
            method: metadata.method.clone(),
            buffer: metadata.buffer.clone(),
            pmid: reference.and_then(|row| row.pmid.clone()),
            doi: reference.and_then(|row| row.doi.clone()),
        });
    }
    Ok(rows)
}

/// Join the cleaned data m:1 with the table information, keeping every
/// measurement row and asserting that (table key, entry index) stays unique.
pub fn denormalized(
    data: &[DataRow],
    info: &[TableInfoRow],
) -> Result<Vec<DenormalizedRow>, PipelineError> {
    let joined = join_left_many_to_one(data, info, |row| row.key, |row| row.key)?;

    let mut seen = HashSet::with_capacity(joined.len());
    let mut rows = Vec::with_capacity(joined.len());
    for (data_row, info_row) in joined {
        if !seen.insert((data_row.key, data_row.entry_index)) {
            return Err(PipelineError::DuplicateKey(format!(
                "{} entry {}",
                data_row.key, data_row.entry_index
            )));
        }
        rows.push(DenormalizedRow {
            data: data_row.clone(),
            info: info_row.cloned(),
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::domain::TableKey;

    fn key(part: i64) -> TableKey {
        TableKey {
            part,
            page: 4,
            column: 1,
            table_index: 1,
        }
    }

    fn comment(part: i64) -> CommentRow {
        CommentRow {
            key: key(part),
            was_spellchecked: false,
            primary_comment: None,
        }
    }

    fn metadata(part: i64, reference_code: &str) -> MetadataRow {
        MetadataRow {
            key: key(part),
            reaction: "A + B = C".to_string(),
            reference_code: reference_code.to_string(),
            secondary_comment: None,
            method: None,
            buffer: None,
        }
    }

    fn reference(code: &str) -> ReferenceRow {
        ReferenceRow {
            reference_code: code.to_string(),
            pmid: Some("12345".to_string()),
            doi: None,
        }
    }

    fn data(part: i64, entry_index: i64) -> DataRow {
        DataRow {
            key: key(part),
            entry_index,
            id: None,
            temperature: 298.15,
            ionic_strength: None,
            hydrogen_potential: None,
            magnesium_potential: None,
            apparent_equilibrium: None,
            additional_info: None,
        }
    }

    #[test]
    fn one_to_one_pairs_every_row() {
        let left = vec![comment(1), comment(2)];
        let right = vec![metadata(2, "a"), metadata(1, "b")];
        let result = join_one_to_one(&left, &right, |row| row.key, |row| row.key).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1.reference_code, "b");
    }

    #[test]
    fn one_to_one_rejects_duplicate_keys() {
        let left = vec![comment(1), comment(1)];
        let right = vec![metadata(1, "a"), metadata(2, "b")];
        let err = join_one_to_one(&left, &right, |row| row.key, |row| row.key).unwrap_err();
        assert_matches!(err, PipelineError::DuplicateKey(_));
    }

    #[test]
    fn one_to_one_rejects_unmatched_rows() {
        let left = vec![comment(1), comment(2)];
        let right = vec![metadata(1, "a")];
        let err = join_one_to_one(&left, &right, |row| row.key, |row| row.key).unwrap_err();
        assert_matches!(err, PipelineError::Cardinality { .. });
    }

    #[test]
    fn many_to_one_keeps_unmatched_rows() {
        let many = vec![data(1, 1), data(2, 1)];
        let one = vec![metadata(1, "a")];
        let result = join_left_many_to_one(&many, &one, |row| row.key, |row| row.key).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].1.is_some());
        assert!(result[1].1.is_none());
    }

    #[test]
    fn many_to_one_rejects_duplicate_one_side() {
        let many = vec![data(1, 1)];
        let one = vec![metadata(1, "a"), metadata(1, "b")];
        let err = join_left_many_to_one(&many, &one, |row| row.key, |row| row.key).unwrap_err();
        assert_matches!(err, PipelineError::DuplicateKey(_));
    }

    #[test]
    fn table_info_attaches_references_by_code() {
        let comments = vec![comment(1), comment(2)];
        let metadata = vec![metadata(1, "bur55"), metadata(2, "unknown")];
        let references = vec![reference("bur55")];
        let rows = table_info(&comments, &metadata, &references).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].pmid.as_deref(), Some("12345"));
        assert_eq!(rows[1].pmid, None);
    }

    #[test]
    fn denormalized_keeps_every_measurement() {
        let data_rows = vec![data(1, 1), data(1, 2), data(9, 1)];
        let info = table_info(
            &[comment(1)],
            &[metadata(1, "bur55")],
            &[reference("bur55")],
        )
        .unwrap();
        let rows = denormalized(&data_rows, &info).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].info.is_some());
        assert!(rows[2].info.is_none());
    }

    #[test]
    fn denormalized_rejects_duplicate_entry_pairs() {
        let data_rows = vec![data(1, 1), data(1, 1)];
        let err = denormalized(&data_rows, &[]).unwrap_err();
        assert_matches!(err, PipelineError::DuplicateKey(_));
    }
}
