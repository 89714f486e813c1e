// SPDX-License-Identifier: Apache-2.0

//! Collaborator traits
//!
//! The orchestrator and the metadata client never talk to the network
//! directly; they are handed implementations of these traits at
//! construction time.

use async_trait::async_trait;

use crate::error::ChatResult;
use crate::request::ChatRequest;
use crate::types::{SqlResult, StatementRequest, TableDescriptor, TableSummary};

/// Metadata and SQL store (a Unity-Catalog-like service)
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    /// Short identifier for logs (e.g. "unity_catalog", "memory")
    fn backend_id(&self) -> &'static str;

    /// Lists the tables of a schema. An empty schema yields an empty list.
    async fn list_tables(&self, catalog: &str, schema: &str) -> ChatResult<Vec<TableSummary>>;

    /// Fetches one table, columns included, by `catalog.schema.table`
    async fn get_table(&self, full_name: &str) -> ChatResult<TableDescriptor>;

    /// Runs one statement and waits at most `request.wait_timeout_secs`
    async fn execute_statement(&self, request: &StatementRequest) -> ChatResult<SqlResult>;
}

/// Model-serving endpoint
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Target endpoint or model identifier
    fn endpoint(&self) -> &str;

    /// Sends one chat request and returns the raw response payload
    async fn send(&self, request: &ChatRequest) -> ChatResult<serde_json::Value>;
}
