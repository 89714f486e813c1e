// SPDX-License-Identifier: Apache-2.0

//! Unity Catalog backend
//!
//! Table metadata comes from the Unity Catalog REST API, statements run on a
//! SQL warehouse through the statement execution API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use tablechat_core::{
    CatalogBackend, ChatError, ChatResult, ColumnDescriptor, SqlResult, StatementRequest,
    TableDescriptor, TableSummary,
};

use super::statement::{clamp_wait, parse_statement_response, statement_body};
use crate::transport::WorkspaceHttp;

const TABLES_PATH: [&str; 4] = ["api", "2.1", "unity-catalog", "tables"];
const STATEMENTS_PATH: [&str; 4] = ["api", "2.0", "sql", "statements"];
const UNKNOWN_TYPE: &str = "UNKNOWN";
/// Upper bound on listing pages, in case a server keeps returning tokens
const MAX_PAGES: usize = 100;
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Slack on top of the statement wait for the HTTP round-trip itself
const STATEMENT_HTTP_SLACK: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ListTablesPage {
    #[serde(default)]
    tables: Vec<TableInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableInfo {
    name: String,
    #[serde(default)]
    catalog_name: Option<String>,
    #[serde(default)]
    schema_name: Option<String>,
    #[serde(default)]
    table_type: Option<String>,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    columns: Vec<ColumnInfo>,
}

#[derive(Debug, Deserialize)]
struct ColumnInfo {
    name: String,
    #[serde(default)]
    type_name: Option<String>,
    #[serde(default)]
    type_text: Option<String>,
    #[serde(default)]
    comment: Option<String>,
}

impl TableInfo {
    fn into_summary(self) -> TableSummary {
        TableSummary {
            name: self.name,
            table_type: self.table_type.unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            comment: self.comment.unwrap_or_default(),
        }
    }
}

pub struct UnityCatalogBackend {
    http: Arc<WorkspaceHttp>,
}

impl UnityCatalogBackend {
    pub fn new(http: Arc<WorkspaceHttp>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl CatalogBackend for UnityCatalogBackend {
    fn backend_id(&self) -> &'static str {
        "unity_catalog"
    }

    #[instrument(skip(self))]
    async fn list_tables(&self, catalog: &str, schema: &str) -> ChatResult<Vec<TableSummary>> {
        let url = self.http.url(&TABLES_PATH)?;
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;
        let mut complete = false;

        for _ in 0..MAX_PAGES {
            let payload = {
                let mut query = vec![("catalog_name", catalog), ("schema_name", schema)];
                if let Some(token) = page_token.as_deref() {
                    query.push(("page_token", token));
                }
                self.http
                    .get_json(url.clone(), &query, METADATA_TIMEOUT)
                    .await?
            };
            let page: ListTablesPage = serde_json::from_value(payload)
                .map_err(|e| ChatError::response_format(format!("table listing: {}", e)))?;

            tables.extend(page.tables.into_iter().map(TableInfo::into_summary));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => {
                    complete = true;
                    break;
                }
            }
        }

        if !complete {
            warn!(
                pages = MAX_PAGES,
                count = tables.len(),
                "Table listing stopped at the page limit; result is partial"
            );
        }
        debug!(count = tables.len(), "Listed tables");
        Ok(tables)
    }

    #[instrument(skip(self))]
    async fn get_table(&self, full_name: &str) -> ChatResult<TableDescriptor> {
        let mut segments = TABLES_PATH.to_vec();
        segments.push(full_name);
        let url = self.http.url(&segments)?;

        let payload = self.http.get_json(url, &[], METADATA_TIMEOUT).await?;
        let info: TableInfo = serde_json::from_value(payload)
            .map_err(|e| ChatError::response_format(format!("table details: {}", e)))?;

        let mut parts = full_name.splitn(3, '.');
        let catalog = info
            .catalog_name
            .or_else(|| parts.next().map(str::to_string))
            .unwrap_or_default();
        let schema = info
            .schema_name
            .or_else(|| parts.next().map(str::to_string))
            .unwrap_or_default();

        let columns = info
            .columns
            .into_iter()
            .map(|c| ColumnDescriptor {
                name: c.name,
                data_type: c
                    .type_name
                    .or(c.type_text)
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                comment: c.comment.unwrap_or_default(),
            })
            .collect();

        Ok(TableDescriptor {
            catalog,
            schema,
            name: info.name,
            table_type: info.table_type.unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
            comment: info.comment.unwrap_or_default(),
            columns,
        })
    }

    #[instrument(skip(self, request), fields(warehouse = %request.warehouse_id))]
    async fn execute_statement(&self, request: &StatementRequest) -> ChatResult<SqlResult> {
        let url = self.http.url(&STATEMENTS_PATH)?;
        let body = statement_body(request);
        let timeout = Duration::from_secs(clamp_wait(request.wait_timeout_secs)) + STATEMENT_HTTP_SLACK;

        let payload = self.http.post_json(url, &body, timeout).await?;
        let result = parse_statement_response(&payload)?;
        debug!(
            columns = result.columns.len(),
            rows = result.rows.len(),
            "Statement finished"
        );
        Ok(result)
    }
}
