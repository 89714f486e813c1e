// SPDX-License-Identifier: Apache-2.0

//! Queries used to discover relationships between tables
//!
//! Constraint queries return the columns `peer_table`, `constraint_name`,
//! `source_column`, `target_column`, one row per column pair, ordered so that
//! the pairs of a composite key are adjacent and in key order. `source_column`
//! is always on the referencing side.

use crate::quote::{information_schema, quote_literal};

/// Which side of the foreign key the target table is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Other tables hold foreign keys pointing at the target
    ReferencedBy,
    /// The target holds foreign keys pointing at other tables
    References,
}

/// Foreign-key pairs touching `catalog.schema.table` from the given side
pub fn constraint_query(catalog: &str, schema: &str, table: &str, direction: Direction) -> String {
    let rc = information_schema(catalog, "referential_constraints");
    let kcu = information_schema(catalog, "key_column_usage");

    // `filtered` is the target table's side, `peer` the other one
    let (filtered, peer) = match direction {
        Direction::ReferencedBy => ("pk", "fk"),
        Direction::References => ("fk", "pk"),
    };

    format!(
        "SELECT \
{peer}.table_catalog || '.' || {peer}.table_schema || '.' || {peer}.table_name AS peer_table, \
rc.constraint_name AS constraint_name, \
fk.column_name AS source_column, \
pk.column_name AS target_column \
FROM {rc} rc \
JOIN {kcu} fk \
ON fk.constraint_catalog = rc.constraint_catalog \
AND fk.constraint_schema = rc.constraint_schema \
AND fk.constraint_name = rc.constraint_name \
JOIN {kcu} pk \
ON pk.constraint_catalog = rc.unique_constraint_catalog \
AND pk.constraint_schema = rc.unique_constraint_schema \
AND pk.constraint_name = rc.unique_constraint_name \
AND pk.ordinal_position = fk.position_in_unique_constraint \
WHERE {filtered}.table_catalog = {c} \
AND {filtered}.table_schema = {s} \
AND {filtered}.table_name = {t} \
ORDER BY peer_table, constraint_name, fk.ordinal_position",
        c = quote_literal(catalog),
        s = quote_literal(schema),
        t = quote_literal(table),
    )
}

/// Every `(table_name, column_name)` of a schema, for name-based inference
pub fn schema_columns_query(catalog: &str, schema: &str) -> String {
    format!(
        "SELECT table_name, column_name \
FROM {columns} \
WHERE table_catalog = {c} AND table_schema = {s} \
ORDER BY table_name, ordinal_position",
        columns = information_schema(catalog, "columns"),
        c = quote_literal(catalog),
        s = quote_literal(schema),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::ensure_read_only;

    #[test]
    fn referenced_by_filters_on_referenced_side() {
        let sql = constraint_query("demo", "sales", "orders", Direction::ReferencedBy);
        assert!(sql.contains("WHERE pk.table_catalog = 'demo'"));
        assert!(sql.contains("AND pk.table_name = 'orders'"));
        assert!(sql.starts_with("SELECT fk.table_catalog"));
    }

    #[test]
    fn references_filters_on_referencing_side() {
        let sql = constraint_query("demo", "sales", "orders", Direction::References);
        assert!(sql.contains("WHERE fk.table_catalog = 'demo'"));
        assert!(sql.starts_with("SELECT pk.table_catalog"));
    }

    #[test]
    fn generated_queries_are_read_only() {
        let sql = constraint_query("demo", "sales", "o'rders", Direction::References);
        assert!(sql.contains("'o''rders'"));
        assert!(ensure_read_only(&sql).is_ok());
        assert!(ensure_read_only(&schema_columns_query("demo", "sales")).is_ok());
    }
}
