// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use tablechat_core::{
    CatalogBackend, ChatError, ChatResult, SqlResult, StatementRequest,
    TableDescriptor, TableSummary,
};

/// Catalog held in memory, for tests and offline demos.
///
/// Statements are not interpreted: each `execute_statement` pops the next
/// scripted result and records the request.
#[derive(Default)]
pub struct InMemoryCatalog {
    tables: BTreeMap<String, TableDescriptor>,
    scripted: Mutex<VecDeque<ChatResult<SqlResult>>>,
    executed: Mutex<Vec<StatementRequest>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.tables.insert(table.full_name(), table);
        self
    }

    /// Queue the result of the next statement
    pub fn push_result(&self, result: ChatResult<SqlResult>) {
        self.scripted.lock().push_back(result);
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> Vec<StatementRequest> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl CatalogBackend for InMemoryCatalog {
    fn backend_id(&self) -> &'static str {
        "memory"
    }

    async fn list_tables(&self, catalog: &str, schema: &str) -> ChatResult<Vec<TableSummary>> {
        Ok(self
            .tables
            .values()
            .filter(|t| t.catalog == catalog && t.schema == schema)
            .map(TableDescriptor::summary)
            .collect())
    }

    async fn get_table(&self, full_name: &str) -> ChatResult<TableDescriptor> {
        self.tables.get(full_name).cloned().ok_or_else(|| {
            ChatError::transport(
                Some(404),
                serde_json::json!({
                    "error_code": "TABLE_DOES_NOT_EXIST",
                    "message": format!("Table '{}' does not exist.", full_name),
                }),
            )
        })
    }

    async fn execute_statement(&self, request: &StatementRequest) -> ChatResult<SqlResult> {
        self.executed.lock().push(request.clone());
        self.scripted.lock().pop_front().unwrap_or_else(|| {
            Err(ChatError::transport(
                None,
                serde_json::Value::String(format!(
                    "no scripted result for statement in {}.{}",
                    request.catalog, request.schema
                )),
            ))
        })
    }
}
