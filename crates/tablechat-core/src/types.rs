// SPDX-License-Identifier: Apache-2.0

//! Data model shared by the catalog client, the tool registry, and the
//! chat orchestrator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ChatError;

// ==================== Conversation ====================

/// Author of a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A model-issued instruction to run one registered tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Opaque identifier chosen by the model
    pub id: String,
    /// Name of the registered tool
    pub name: String,
    /// Parameter name to JSON value
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// One entry of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Absent only for assistant messages that carry tool calls
    pub content: Option<String>,
    /// Links a tool message to the call that produced it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRequest>>,
}

impl Message {
    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    /// Assistant turn that requests tool executions
    pub fn assistant_tool_calls(content: Option<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_call_id: None,
            tool_calls: Some(calls),
        }
    }

    /// Result of one tool call, linked back by id
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

// ==================== Tool declarations ====================

/// JSON-schema type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
}

/// A tool the model may call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    /// Natural-language text the model routes on
    pub description: String,
    /// Ordered parameter list
    pub parameters: Vec<ToolParameter>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn param(
        mut self,
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.push(ToolParameter {
            name: name.into(),
            param_type,
            description: description.into(),
            required,
        });
        self
    }

    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    pub fn declares(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
    }

    /// JSON-schema object describing the parameters
    pub fn parameters_schema(&self) -> Value {
        let mut properties = Map::new();
        for p in &self.parameters {
            properties.insert(
                p.name.clone(),
                serde_json::json!({
                    "type": p.param_type.as_str(),
                    "description": p.description,
                }),
            );
        }
        let required: Vec<&str> = self.required_params().collect();
        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

// ==================== Catalog metadata ====================

/// Entry of a schema's table listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub table_type: String,
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub comment: String,
}

/// Full description of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub catalog: String,
    pub schema: String,
    pub name: String,
    pub table_type: String,
    pub comment: String,
    pub columns: Vec<ColumnDescriptor>,
}

impl TableDescriptor {
    /// `catalog.schema.table`
    pub fn full_name(&self) -> String {
        qualified_name(&self.catalog, &self.schema, &self.name)
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            name: self.name.clone(),
            table_type: self.table_type.clone(),
            comment: self.comment.clone(),
        }
    }
}

pub fn qualified_name(catalog: &str, schema: &str, table: &str) -> String {
    format!("{}.{}.{}", catalog, schema, table)
}

/// Tabular result of a SQL statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SqlResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SqlResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }
}

/// Everything a catalog backend needs to run one statement
#[derive(Debug, Clone, PartialEq)]
pub struct StatementRequest {
    pub statement: String,
    pub warehouse_id: String,
    pub catalog: String,
    pub schema: String,
    pub wait_timeout_secs: u64,
}

// ==================== Relationships ====================

/// How relationships are discovered for a deployment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipStrategy {
    /// Foreign-key constraints declared in information_schema
    #[default]
    ExplicitConstraints,
    /// `<name>_id` column matching; approximate
    Heuristic,
}

impl RelationshipStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipStrategy::ExplicitConstraints => "explicit_constraints",
            RelationshipStrategy::Heuristic => "heuristic",
        }
    }

    /// Whether edges produced by this strategy are backed by real constraints
    pub fn is_authoritative(&self) -> bool {
        matches!(self, RelationshipStrategy::ExplicitConstraints)
    }
}

impl fmt::Display for RelationshipStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipStrategy {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "explicit_constraints" | "explicit" | "constraints" => {
                Ok(RelationshipStrategy::ExplicitConstraints)
            }
            "heuristic" => Ok(RelationshipStrategy::Heuristic),
            other => Err(ChatError::configuration(format!(
                "unknown relationship strategy '{}'",
                other
            ))),
        }
    }
}

/// One (referencing column, referenced column) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    /// Column on the referencing side
    pub source: String,
    /// Column on the referenced side
    pub target: String,
}

/// A foreign-key-like link to one peer table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub peer_table: String,
    /// Constraint name, or `<referencing>_<referenced>_inferred`
    pub constraint: String,
    pub columns: Vec<ColumnPair>,
    /// True when the edge was guessed from column names
    pub inferred: bool,
}

/// Incoming and outgoing edges of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipSet {
    pub table: String,
    pub strategy: RelationshipStrategy,
    /// Edges where another table's column points at this table
    pub referenced_by: Vec<RelationshipEdge>,
    /// Edges where this table's column points at another table
    pub references: Vec<RelationshipEdge>,
}

impl RelationshipSet {
    pub fn empty(table: impl Into<String>, strategy: RelationshipStrategy) -> Self {
        Self {
            table: table.into(),
            strategy,
            referenced_by: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.referenced_by.is_empty() && self.references.is_empty()
    }
}
