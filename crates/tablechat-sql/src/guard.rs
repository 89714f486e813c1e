// SPDX-License-Identifier: Apache-2.0

//! Read-only statement guard for model-supplied SQL

use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SqlGuardError {
    #[error("query is empty")]
    Empty,

    #[error("could not parse query: {0}")]
    Parse(String),

    #[error("only read-only statements are allowed (found: {0})")]
    NotReadOnly(String),
}

/// Parse `sql` and accept it only if every statement is a read
///
/// Returns the number of statements on success.
pub fn ensure_read_only(sql: &str) -> Result<usize, SqlGuardError> {
    if sql.trim().trim_end_matches(';').trim().is_empty() {
        return Err(SqlGuardError::Empty);
    }

    let statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| SqlGuardError::Parse(e.to_string()))?;
    if statements.is_empty() {
        return Err(SqlGuardError::Empty);
    }

    for statement in &statements {
        if !is_read_only(statement) {
            return Err(SqlGuardError::NotReadOnly(statement_keyword(statement)));
        }
    }
    Ok(statements.len())
}

fn is_read_only(statement: &Statement) -> bool {
    match statement {
        Statement::Query(query) => is_read_only_query(query),
        // EXPLAIN ANALYZE executes its statement
        Statement::Explain { statement, .. } => is_read_only(statement),
        Statement::ExplainTable { .. }
        | Statement::ShowTables { .. }
        | Statement::ShowColumns { .. } => true,
        _ => false,
    }
}

// FOR UPDATE / FOR SHARE take row locks
fn is_read_only_query(query: &Query) -> bool {
    query.locks.is_empty() && is_read_only_body(&query.body)
}

fn is_read_only_body(body: &SetExpr) -> bool {
    match body {
        // SELECT ... INTO creates a table
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Values(_) | SetExpr::Table(_) => true,
        SetExpr::Query(inner) => is_read_only_query(inner),
        SetExpr::SetOperation { left, right, .. } => {
            is_read_only_body(left) && is_read_only_body(right)
        }
        _ => false,
    }
}

fn statement_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or("unknown")
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_select_and_union() {
        assert_eq!(ensure_read_only("SELECT 1"), Ok(1));
        assert_eq!(
            ensure_read_only("SELECT a FROM t UNION ALL SELECT b FROM u;"),
            Ok(1)
        );
        assert_eq!(ensure_read_only("SELECT 1; SELECT 2"), Ok(2));
    }

    #[test]
    fn rejects_mutations() {
        assert_eq!(
            ensure_read_only("DELETE FROM orders"),
            Err(SqlGuardError::NotReadOnly("DELETE".to_string()))
        );
        assert!(matches!(
            ensure_read_only("SELECT 1; DROP TABLE orders"),
            Err(SqlGuardError::NotReadOnly(_))
        ));
        assert!(matches!(
            ensure_read_only("EXPLAIN ANALYZE DELETE FROM orders"),
            Err(SqlGuardError::NotReadOnly(_))
        ));
        assert_eq!(
            ensure_read_only("SELECT * INTO archive_orders FROM orders"),
            Err(SqlGuardError::NotReadOnly("SELECT".to_string()))
        );
        assert!(matches!(
            ensure_read_only("SELECT * FROM orders FOR UPDATE"),
            Err(SqlGuardError::NotReadOnly(_))
        ));
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert_eq!(ensure_read_only("  ; "), Err(SqlGuardError::Empty));
        assert!(matches!(
            ensure_read_only("SELEKT * FRM"),
            Err(SqlGuardError::Parse(_))
        ));
    }
}
