// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use tablechat_core::{
    qualified_name, CatalogBackend, ChatError, ChatResult, RelationshipSet, RelationshipStrategy,
    SqlResult, StatementRequest, TableDescriptor, TableSummary,
};
use tablechat_sql::{constraint_query, schema_columns_query, Direction};

use super::relationships::{group_constraint_rows, infer_from_names, SchemaColumns};
use crate::transport::error_message;

pub const DEFAULT_SQL_WAIT_SECS: u64 = 30;

/// Catalog, table, and relationship lookups over a [`CatalogBackend`].
///
/// Holds no state besides its collaborators; every call goes to the backend.
pub struct MetadataClient {
    backend: Arc<dyn CatalogBackend>,
    warehouse_id: Option<String>,
    strategy: RelationshipStrategy,
    sql_wait_secs: u64,
}

impl MetadataClient {
    pub fn new(
        backend: Arc<dyn CatalogBackend>,
        warehouse_id: Option<String>,
        strategy: RelationshipStrategy,
    ) -> Self {
        Self {
            backend,
            warehouse_id: warehouse_id.filter(|w| !w.trim().is_empty()),
            strategy,
            sql_wait_secs: DEFAULT_SQL_WAIT_SECS,
        }
    }

    pub fn with_sql_wait(mut self, secs: u64) -> Self {
        self.sql_wait_secs = secs;
        self
    }

    pub fn strategy(&self) -> RelationshipStrategy {
        self.strategy
    }

    pub fn backend_id(&self) -> &'static str {
        self.backend.backend_id()
    }

    /// Tables of `catalog.schema`; empty when the schema has none
    #[instrument(skip(self))]
    pub async fn list_tables(&self, catalog: &str, schema: &str) -> ChatResult<Vec<TableSummary>> {
        self.backend
            .list_tables(catalog, schema)
            .await
            .map_err(|e| wrap(format!("{}.{}", catalog, schema), e))
    }

    #[instrument(skip(self))]
    pub async fn get_table_details(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> ChatResult<TableDescriptor> {
        let full_name = qualified_name(catalog, schema, table);
        self.backend
            .get_table(&full_name)
            .await
            .map_err(|e| wrap(full_name, e))
    }

    /// Run one query on the configured warehouse; no retries
    #[instrument(skip(self, query))]
    pub async fn execute_sql(&self, query: &str, catalog: &str, schema: &str) -> ChatResult<SqlResult> {
        self.run(query, catalog, schema)
            .await
            .map_err(|e| wrap(format!("{}.{}", catalog, schema), e))
    }

    /// Incoming and outgoing relationships of one table.
    ///
    /// A table without relationships yields an empty set.
    #[instrument(skip(self), fields(strategy = %self.strategy))]
    pub async fn get_related_tables(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> ChatResult<RelationshipSet> {
        let full_name = qualified_name(catalog, schema, table);
        let result = match self.strategy {
            RelationshipStrategy::ExplicitConstraints => {
                self.explicit_relationships(catalog, schema, table).await
            }
            RelationshipStrategy::Heuristic => {
                self.heuristic_relationships(catalog, schema, table).await
            }
        };

        let mut set = result.map_err(|e| wrap(full_name.clone(), e))?;
        set.table = full_name;
        debug!(
            referenced_by = set.referenced_by.len(),
            references = set.references.len(),
            "Resolved relationships"
        );
        Ok(set)
    }

    async fn explicit_relationships(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> ChatResult<RelationshipSet> {
        let incoming = self
            .run(
                &constraint_query(catalog, schema, table, Direction::ReferencedBy),
                catalog,
                schema,
            )
            .await?;
        let outgoing = self
            .run(
                &constraint_query(catalog, schema, table, Direction::References),
                catalog,
                schema,
            )
            .await?;

        let mut set = RelationshipSet::empty(table, self.strategy);
        set.referenced_by = group_constraint_rows(&incoming)?;
        set.references = group_constraint_rows(&outgoing)?;
        Ok(set)
    }

    async fn heuristic_relationships(
        &self,
        catalog: &str,
        schema: &str,
        table: &str,
    ) -> ChatResult<RelationshipSet> {
        let rows = self
            .run(&schema_columns_query(catalog, schema), catalog, schema)
            .await?;
        let columns = SchemaColumns::from_result(&rows)?;
        let (referenced_by, references) = infer_from_names(catalog, schema, table, &columns);

        let mut set = RelationshipSet::empty(table, self.strategy);
        set.referenced_by = referenced_by;
        set.references = references;
        Ok(set)
    }

    async fn run(&self, statement: &str, catalog: &str, schema: &str) -> ChatResult<SqlResult> {
        let warehouse_id = self.warehouse_id.clone().ok_or_else(|| {
            ChatError::configuration("resource id not set (DATABRICKS_WAREHOUSE_ID)")
        })?;

        let request = StatementRequest {
            statement: statement.to_string(),
            warehouse_id,
            catalog: catalog.to_string(),
            schema: schema.to_string(),
            wait_timeout_secs: self.sql_wait_secs,
        };
        self.backend.execute_statement(&request).await
    }
}

/// Attach the qualified name to a backend failure.
///
/// Configuration errors pass through untouched.
fn wrap(target: String, err: ChatError) -> ChatError {
    match err {
        ChatError::Configuration { .. } | ChatError::Metadata { .. } => err,
        ChatError::Transport { ref detail, .. } => {
            let message = error_message(detail).unwrap_or_else(|| err.message());
            warn!(target = %target, error = %err, "Catalog call failed");
            ChatError::metadata(target, message)
        }
        other => {
            warn!(target = %target, error = %other, "Catalog call failed");
            ChatError::metadata(target, other.message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::InMemoryCatalog;
    use serde_json::json;
    use tablechat_core::ColumnDescriptor;

    fn orders() -> TableDescriptor {
        TableDescriptor {
            catalog: "demo".into(),
            schema: "sales".into(),
            name: "orders".into(),
            table_type: "MANAGED".into(),
            comment: "order records".into(),
            columns: vec![ColumnDescriptor {
                name: "id".into(),
                data_type: "BIGINT".into(),
                comment: String::new(),
            }],
        }
    }

    fn client(catalog: InMemoryCatalog, warehouse: Option<&str>) -> (Arc<InMemoryCatalog>, MetadataClient) {
        let catalog = Arc::new(catalog);
        let client = MetadataClient::new(
            catalog.clone(),
            warehouse.map(str::to_string),
            RelationshipStrategy::ExplicitConstraints,
        );
        (catalog, client)
    }

    #[tokio::test]
    async fn missing_table_names_qualified_target() {
        let (_, client) = client(InMemoryCatalog::new().with_table(orders()), None);
        let err = client
            .get_table_details("demo", "sales", "nope")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ChatError::metadata("demo.sales.nope", "Table 'demo.sales.nope' does not exist.")
        );
    }

    #[tokio::test]
    async fn sql_requires_warehouse() {
        let (_, client) = client(InMemoryCatalog::new(), Some("  "));
        let err = client.execute_sql("SELECT 1", "demo", "sales").await.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.message().contains("resource id not set"));

        let err = client
            .get_related_tables("demo", "sales", "orders")
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn sql_failure_is_wrapped_once() {
        let (catalog, client) = client(InMemoryCatalog::new(), Some("wh-1"));
        catalog.push_result(Err(ChatError::transport(
            Some(400),
            json!({"error_code": "INVALID_PARAMETER_VALUE", "message": "bad query"}),
        )));
        let err = client.execute_sql("SELECT", "demo", "sales").await.unwrap_err();
        assert_eq!(err, ChatError::metadata("demo.sales", "bad query"));
        assert_eq!(catalog.executed()[0].warehouse_id, "wh-1");
        assert_eq!(catalog.executed()[0].wait_timeout_secs, DEFAULT_SQL_WAIT_SECS);
    }

    #[tokio::test]
    async fn explicit_strategy_runs_both_directions() {
        let (catalog, client) = client(InMemoryCatalog::new(), Some("wh-1"));
        catalog.push_result(Ok(SqlResult::new(
            vec![
                "peer_table".into(),
                "constraint_name".into(),
                "source_column".into(),
                "target_column".into(),
            ],
            vec![vec![
                json!("demo.sales.order_lines"),
                json!("fk_lines_orders"),
                json!("order_id"),
                json!("id"),
            ]],
        )));
        catalog.push_result(Ok(SqlResult::default()));

        let set = client
            .get_related_tables("demo", "sales", "orders")
            .await
            .unwrap();
        assert_eq!(set.table, "demo.sales.orders");
        assert_eq!(set.referenced_by.len(), 1);
        assert!(set.references.is_empty());

        let executed = catalog.executed();
        assert_eq!(executed.len(), 2);
        assert!(executed[0].statement.contains("WHERE pk.table_catalog"));
        assert!(executed[1].statement.contains("WHERE fk.table_catalog"));
    }

    #[tokio::test]
    async fn heuristic_strategy_uses_one_column_scan() {
        let catalog = Arc::new(InMemoryCatalog::new());
        catalog.push_result(Ok(SqlResult::new(
            vec!["table_name".into(), "column_name".into()],
            vec![
                vec![json!("customers"), json!("id")],
                vec![json!("orders"), json!("customer_id")],
            ],
        )));
        let client = MetadataClient::new(
            catalog.clone(),
            Some("wh".into()),
            RelationshipStrategy::Heuristic,
        );

        let set = client
            .get_related_tables("demo", "sales", "customers")
            .await
            .unwrap();
        assert_eq!(set.strategy, RelationshipStrategy::Heuristic);
        assert_eq!(set.referenced_by[0].constraint, "orders_customers_inferred");
        assert_eq!(catalog.executed().len(), 1);
    }
}
