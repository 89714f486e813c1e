// SPDX-License-Identifier: Apache-2.0

//! Relationship inference
//!
//! Two strategies produce the same [`tablechat_core::RelationshipSet`] shape:
//!
//! - constraint rows from information_schema, grouped per constraint so a
//!   composite key becomes one edge with several column pairs;
//! - `<name>_id` column matching over a schema's columns. Edges built this
//!   way are marked `inferred` and carry a synthesized constraint id.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use tablechat_core::{
    qualified_name, ChatError, ChatResult, ColumnPair, RelationshipEdge, SqlResult,
};

static ID_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(.+)_id$").expect("constant pattern compiles"));

/// Text of a result cell; the statements API returns every value as a string
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn required_column(result: &SqlResult, name: &str) -> ChatResult<usize> {
    result.column_index(name).ok_or_else(|| {
        ChatError::response_format(format!(
            "relationship query result has no '{}' column (got {:?})",
            name, result.columns
        ))
    })
}

/// Group constraint rows into edges, keeping first-seen order.
///
/// Rows sharing `(peer_table, constraint_name)` collapse into one edge whose
/// column pairs keep row order.
pub fn group_constraint_rows(result: &SqlResult) -> ChatResult<Vec<RelationshipEdge>> {
    if result.rows.is_empty() {
        return Ok(Vec::new());
    }

    let peer_idx = required_column(result, "peer_table")?;
    let constraint_idx = required_column(result, "constraint_name")?;
    let source_idx = required_column(result, "source_column")?;
    let target_idx = required_column(result, "target_column")?;

    let mut edges: Vec<RelationshipEdge> = Vec::new();
    for row in &result.rows {
        let cell = |idx: usize| row.get(idx).and_then(cell_text);
        let (Some(peer), Some(constraint), Some(source), Some(target)) = (
            cell(peer_idx),
            cell(constraint_idx),
            cell(source_idx),
            cell(target_idx),
        ) else {
            continue;
        };

        let pair = ColumnPair { source, target };
        match edges
            .iter_mut()
            .find(|e| e.peer_table == peer && e.constraint == constraint)
        {
            Some(edge) => edge.columns.push(pair),
            None => edges.push(RelationshipEdge {
                peer_table: peer,
                constraint,
                columns: vec![pair],
                inferred: false,
            }),
        }
    }
    Ok(edges)
}

/// Token of an `_id` column: `customer_id` -> `customer`
pub fn id_token(column: &str) -> Option<String> {
    ID_SUFFIX
        .captures(column)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|t| !t.trim_matches('_').is_empty())
}

/// Columns of one schema, grouped per table in listing order
#[derive(Debug, Default)]
pub struct SchemaColumns {
    tables: Vec<(String, Vec<String>)>,
}

impl SchemaColumns {
    /// From `(table_name, column_name)` rows
    pub fn from_result(result: &SqlResult) -> ChatResult<Self> {
        let mut columns = Self::default();
        if result.rows.is_empty() {
            return Ok(columns);
        }
        let table_idx = required_column(result, "table_name")?;
        let column_idx = required_column(result, "column_name")?;

        for row in &result.rows {
            let (Some(table), Some(column)) = (
                row.get(table_idx).and_then(cell_text),
                row.get(column_idx).and_then(cell_text),
            ) else {
                continue;
            };
            columns.push(table, column);
        }
        Ok(columns)
    }

    pub fn push(&mut self, table: String, column: String) {
        match self.tables.iter_mut().find(|(t, _)| *t == table) {
            Some((_, cols)) => cols.push(column),
            None => self.tables.push((table, vec![column])),
        }
    }

    fn columns_of(&self, table: &str) -> Option<&[String]> {
        self.tables
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(table))
            .map(|(_, cols)| cols.as_slice())
    }

    fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns_of(table)
            .is_some_and(|cols| cols.iter().any(|c| c.eq_ignore_ascii_case(column)))
    }
}

/// Referenced column guessed for `column` on `referenced`: the same name if
/// that table has it, else `id` if present, else the same name.
fn guess_target(columns: &SchemaColumns, referenced: &str, column: &str) -> String {
    if columns.has_column(referenced, column) {
        column.to_string()
    } else if columns.has_column(referenced, "id") {
        "id".to_string()
    } else {
        column.to_string()
    }
}

fn inferred_constraint(referencing: &str, referenced: &str) -> String {
    format!("{}_{}_inferred", referencing, referenced)
}

fn add_inferred(edges: &mut Vec<RelationshipEdge>, peer: String, constraint: String, pair: ColumnPair) {
    match edges.iter_mut().find(|e| e.constraint == constraint) {
        Some(edge) => edge.columns.push(pair),
        None => edges.push(RelationshipEdge {
            peer_table: peer,
            constraint,
            columns: vec![pair],
            inferred: true,
        }),
    }
}

/// Name-based edges around `table`, as `(referenced_by, references)`.
///
/// A column `<token>_id` on table A is taken to point at table B when
/// `token` occurs, case-insensitively, inside B's name. Self-links are
/// skipped. Matches are approximate in both directions.
pub fn infer_from_names(
    catalog: &str,
    schema: &str,
    table: &str,
    columns: &SchemaColumns,
) -> (Vec<RelationshipEdge>, Vec<RelationshipEdge>) {
    let target_lower = table.to_ascii_lowercase();
    let mut referenced_by = Vec::new();
    let mut references = Vec::new();

    for (other, other_columns) in &columns.tables {
        if other.eq_ignore_ascii_case(table) {
            continue;
        }
        let other_lower = other.to_ascii_lowercase();

        // other.<token>_id -> table
        for column in other_columns {
            let Some(token) = id_token(column) else { continue };
            if target_lower.contains(&token) {
                let pair = ColumnPair {
                    source: column.clone(),
                    target: guess_target(columns, table, column),
                };
                add_inferred(
                    &mut referenced_by,
                    qualified_name(catalog, schema, other),
                    inferred_constraint(other, table),
                    pair,
                );
            }
        }

        // table.<token>_id -> other
        for column in columns.columns_of(table).unwrap_or_default() {
            let Some(token) = id_token(column) else { continue };
            if other_lower.contains(&token) {
                let pair = ColumnPair {
                    source: column.clone(),
                    target: guess_target(columns, other, column),
                };
                add_inferred(
                    &mut references,
                    qualified_name(catalog, schema, other),
                    inferred_constraint(table, other),
                    pair,
                );
            }
        }
    }

    (referenced_by, references)
}
