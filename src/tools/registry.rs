// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use tablechat_core::{ChatError, ChatResult, ToolDefinition};
use tablechat_sql::ensure_read_only;

use super::definitions::ToolKind;
use super::format;
use crate::metadata::MetadataClient;
use crate::metrics;

/// Arguments a tool handler reads; each must be a declared, required parameter
fn handler_args(kind: ToolKind) -> &'static [&'static str] {
    match kind {
        ToolKind::ListTables => &["catalog", "schema"],
        ToolKind::GetTableDetails | ToolKind::GetRelatedTables => &["catalog", "schema", "table"],
        ToolKind::ExecuteSql => &["query", "catalog", "schema"],
    }
}

struct RegisteredTool {
    kind: ToolKind,
    definition: ToolDefinition,
}

/// Closed set of tools exposed to the model, dispatched by exact name.
///
/// Results are always text: failures become `Error: ...` lines that the
/// model reads like any other tool output.
pub struct ToolRegistry {
    client: Arc<MetadataClient>,
    tools: Vec<RegisteredTool>,
}

impl ToolRegistry {
    /// Registry with the catalog tools; `execute_sql` is opt-in
    pub fn new(client: Arc<MetadataClient>, sql_tool: bool) -> ChatResult<Self> {
        let mut registry = Self {
            client,
            tools: Vec::new(),
        };
        registry.register(ToolKind::ListTables)?;
        registry.register(ToolKind::GetTableDetails)?;
        registry.register(ToolKind::GetRelatedTables)?;
        if sql_tool {
            registry.register(ToolKind::ExecuteSql)?;
        }
        info!(
            tools = ?registry.names(),
            backend = registry.client.backend_id(),
            "Tool registry ready"
        );
        Ok(registry)
    }

    fn register(&mut self, kind: ToolKind) -> ChatResult<()> {
        let definition = kind.definition();
        if self.tools.iter().any(|t| t.definition.name == definition.name) {
            return Err(ChatError::configuration(format!(
                "tool '{}' registered twice",
                definition.name
            )));
        }
        for arg in handler_args(kind) {
            let declared_required = definition
                .parameters
                .iter()
                .any(|p| p.name == *arg && p.required);
            if !declared_required {
                return Err(ChatError::configuration(format!(
                    "tool '{}' does not declare required parameter '{}'",
                    definition.name, arg
                )));
            }
        }
        self.tools.push(RegisteredTool { kind, definition });
        Ok(())
    }

    /// Declarations in registration order
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.definition.name.as_str()).collect()
    }

    /// Run one tool call and render its result.
    ///
    /// Never fails: unknown tools, missing arguments, and backend errors are
    /// reported in the returned text.
    pub async fn execute(&self, name: &str, arguments: &Map<String, Value>) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.definition.name == name) else {
            warn!(tool = name, "Model requested an unknown tool");
            metrics::record_tool_call(false);
            return format!("Error: unknown tool '{}'", name);
        };

        let missing: Vec<&str> = tool
            .definition
            .required_params()
            .filter(|param| string_arg(arguments, param).is_none())
            .collect();
        if !missing.is_empty() {
            debug!(tool = name, missing = ?missing, "Tool call without required arguments");
            metrics::record_tool_call(false);
            return format!("Error: missing required parameter(s): {}", missing.join(", "));
        }

        match self.dispatch(tool.kind, arguments).await {
            Ok(text) => {
                metrics::record_tool_call(true);
                text
            }
            Err(e) => {
                let text = failure_text(&e);
                let e = match e {
                    ChatError::ToolExecution { .. } => e,
                    _ => ChatError::tool_execution(name, text.clone()),
                };
                warn!(tool = name, error = %e, "Tool call failed");
                metrics::record_tool_call(false);
                format!("Error: {}", text)
            }
        }
    }

    async fn dispatch(&self, kind: ToolKind, args: &Map<String, Value>) -> ChatResult<String> {
        // presence was checked against the declaration
        let arg = |name: &str| string_arg(args, name).unwrap_or_default();

        match kind {
            ToolKind::ListTables => {
                let (catalog, schema) = (arg("catalog"), arg("schema"));
                let tables = self.client.list_tables(&catalog, &schema).await?;
                Ok(format::table_list(&catalog, &schema, &tables))
            }
            ToolKind::GetTableDetails => {
                let table = self
                    .client
                    .get_table_details(&arg("catalog"), &arg("schema"), &arg("table"))
                    .await?;
                Ok(format::table_details(&table))
            }
            ToolKind::GetRelatedTables => {
                let set = self
                    .client
                    .get_related_tables(&arg("catalog"), &arg("schema"), &arg("table"))
                    .await?;
                Ok(format::relationships(&set))
            }
            ToolKind::ExecuteSql => {
                let query = arg("query");
                ensure_read_only(&query)
                    .map_err(|e| ChatError::tool_execution(kind.name(), e.to_string()))?;
                let result = self
                    .client
                    .execute_sql(&query, &arg("catalog"), &arg("schema"))
                    .await?;
                Ok(format::sql_result(&result))
            }
        }
    }
}

/// Failure as the model sees it; catalog failures name the object involved
fn failure_text(error: &ChatError) -> String {
    match error {
        ChatError::Metadata { target, message } => format!("{}: {}", target, message),
        other => other.message(),
    }
}

/// Non-empty string argument; numbers and booleans are accepted as text
fn string_arg(args: &Map<String, Value>, name: &str) -> Option<String> {
    match args.get(name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
