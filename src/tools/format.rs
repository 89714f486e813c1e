// SPDX-License-Identifier: Apache-2.0

//! Model-facing text for tool results

use std::fmt::Write;

use serde_json::Value;

use tablechat_core::{RelationshipEdge, RelationshipSet, SqlResult, TableDescriptor, TableSummary};

/// Rows shown by `execute_sql`
pub const MAX_SQL_ROWS: usize = 50;

pub const HEURISTIC_NOTE: &str = "Note: these relationships were inferred from `_id` column names, \
not from declared constraints. Some may be wrong and real relationships may be missing.";

pub fn table_list(catalog: &str, schema: &str, tables: &[TableSummary]) -> String {
    if tables.is_empty() {
        return format!("No tables found in schema {}.{}.", catalog, schema);
    }

    let mut out = format!("Tables in {}.{}:\n\n", catalog, schema);
    for table in tables {
        let _ = write!(out, "- {} ({})", table.name, table.table_type);
        if !table.comment.is_empty() {
            let _ = write!(out, ": {}", table.comment);
        }
        out.push('\n');
    }
    out
}

pub fn table_details(table: &TableDescriptor) -> String {
    let mut out = format!("Table: {}\nType: {}\n", table.full_name(), table.table_type);
    if !table.comment.is_empty() {
        let _ = writeln!(out, "Description: {}", table.comment);
    }
    out.push_str("\nColumns:\n");
    for column in &table.columns {
        let _ = write!(out, "- {} ({})", column.name, column.data_type);
        if !column.comment.is_empty() {
            let _ = write!(out, ": {}", column.comment);
        }
        out.push('\n');
    }
    out
}

fn edge_line(out: &mut String, edge: &RelationshipEdge, referencing: &str, referenced: &str) {
    let pairs: Vec<String> = edge
        .columns
        .iter()
        .map(|p| format!("{}.{} -> {}.{}", referencing, p.source, referenced, p.target))
        .collect();
    let _ = writeln!(out, "- {} [{}]: {}", edge.peer_table, edge.constraint, pairs.join(", "));
}

pub fn relationships(set: &RelationshipSet) -> String {
    let mut out = String::new();

    if set.is_empty() {
        let _ = write!(out, "No related tables found for {}.", set.table);
    } else {
        let _ = writeln!(out, "Relationships of {} ({}):", set.table, set.strategy);

        out.push_str("\nReferenced by:\n");
        if set.referenced_by.is_empty() {
            out.push_str("- (none)\n");
        }
        for edge in &set.referenced_by {
            edge_line(&mut out, edge, &edge.peer_table, &set.table);
        }

        out.push_str("\nReferences:\n");
        if set.references.is_empty() {
            out.push_str("- (none)\n");
        }
        for edge in &set.references {
            edge_line(&mut out, edge, &set.table, &edge.peer_table);
        }
    }

    if !set.strategy.is_authoritative() {
        out.push_str("\n\n");
        out.push_str(HEURISTIC_NOTE);
    }
    out
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.replace('\n', " "),
        other => other.to_string(),
    }
}

/// Pipe table, at most [`MAX_SQL_ROWS`] rows
pub fn sql_result(result: &SqlResult) -> String {
    if result.rows.is_empty() {
        return format!(
            "Query returned no rows (columns: {}).",
            result.columns.join(", ")
        );
    }

    let mut out = String::new();
    let _ = writeln!(out, "{}", result.columns.join(" | "));
    let _ = writeln!(
        out,
        "{}",
        vec!["---"; result.columns.len().max(1)].join(" | ")
    );
    for row in result.rows.iter().take(MAX_SQL_ROWS) {
        let cells: Vec<String> = row.iter().map(cell).collect();
        let _ = writeln!(out, "{}", cells.join(" | "));
    }
    if result.rows.len() > MAX_SQL_ROWS {
        let _ = writeln!(out, "... {} more rows", result.rows.len() - MAX_SQL_ROWS);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tablechat_core::{ColumnDescriptor, ColumnPair, RelationshipStrategy};

    #[test]
    fn table_list_lines() {
        let tables = vec![
            TableSummary {
                name: "orders".into(),
                table_type: "MANAGED".into(),
                comment: "order records".into(),
            },
            TableSummary {
                name: "v_orders".into(),
                table_type: "VIEW".into(),
                comment: String::new(),
            },
        ];
        assert_eq!(
            table_list("demo", "sales", &tables),
            "Tables in demo.sales:\n\n- orders (MANAGED): order records\n- v_orders (VIEW)\n"
        );
        assert_eq!(
            table_list("demo", "empty", &[]),
            "No tables found in schema demo.empty."
        );
    }

    #[test]
    fn table_details_lists_columns() {
        let table = TableDescriptor {
            catalog: "demo".into(),
            schema: "sales".into(),
            name: "orders".into(),
            table_type: "MANAGED".into(),
            comment: String::new(),
            columns: vec![
                ColumnDescriptor {
                    name: "id".into(),
                    data_type: "LONG".into(),
                    comment: "primary key".into(),
                },
                ColumnDescriptor {
                    name: "total".into(),
                    data_type: "DECIMAL".into(),
                    comment: String::new(),
                },
            ],
        };
        assert_eq!(
            table_details(&table),
            "Table: demo.sales.orders\nType: MANAGED\n\nColumns:\n- id (LONG): primary key\n- total (DECIMAL)\n"
        );
    }

    #[test]
    fn relationships_use_arrows() {
        let mut set = RelationshipSet::empty("demo.sales.orders", RelationshipStrategy::ExplicitConstraints);
        set.referenced_by.push(RelationshipEdge {
            peer_table: "demo.sales.order_lines".into(),
            constraint: "fk_lines".into(),
            columns: vec![
                ColumnPair { source: "order_id".into(), target: "id".into() },
                ColumnPair { source: "region".into(), target: "region".into() },
            ],
            inferred: false,
        });

        let text = relationships(&set);
        assert!(text.contains(
            "- demo.sales.order_lines [fk_lines]: demo.sales.order_lines.order_id -> demo.sales.orders.id, \
demo.sales.order_lines.region -> demo.sales.orders.region"
        ));
        assert!(text.contains("References:\n- (none)"));
        assert!(!text.contains(HEURISTIC_NOTE));
    }

    #[test]
    fn empty_heuristic_result_still_carries_note() {
        let set = RelationshipSet::empty("demo.sales.orders", RelationshipStrategy::Heuristic);
        let text = relationships(&set);
        assert!(text.starts_with("No related tables found for demo.sales.orders."));
        assert!(text.ends_with(HEURISTIC_NOTE));
    }

    #[test]
    fn sql_result_is_capped() {
        let rows: Vec<Vec<Value>> = (0..53).map(|i| vec![json!(i.to_string()), Value::Null]).collect();
        let text = sql_result(&SqlResult::new(vec!["n".into(), "x".into()], rows));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "n | x");
        assert_eq!(lines[1], "--- | ---");
        assert_eq!(lines[2], "0 | NULL");
        assert_eq!(lines.len(), 2 + MAX_SQL_ROWS + 1);
        assert_eq!(lines.last().copied(), Some("... 3 more rows"));
    }

    #[test]
    fn sql_result_without_rows() {
        let text = sql_result(&SqlResult::new(vec!["a".into()], vec![]));
        assert_eq!(text, "Query returned no rows (columns: a).");
    }
}
