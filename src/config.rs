// SPDX-License-Identifier: Apache-2.0

//! Application configuration
//!
//! Values come from an optional JSON settings file, then environment
//! variables, then command-line flags (applied by the binary).

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tablechat_core::{ChatError, ChatResult, RelationshipStrategy};

use crate::chat::ToolLoopMode;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Everything the core needs to build a conversation pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Workspace base URL, e.g. `https://adb-123.azuredatabricks.net`
    pub host: Option<String>,
    /// Serving endpoint name
    pub endpoint: Option<String>,
    /// SQL warehouse used for statement execution
    pub warehouse_id: Option<String>,
    /// Access token; only read from the environment, never written back
    #[serde(skip)]
    pub token: Option<String>,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Maximum model round-trips per turn in tool mode
    pub max_tool_iterations: usize,
    pub tool_mode: ToolLoopMode,
    pub tools_enabled: bool,
    /// Expose the read-only `execute_sql` tool
    pub sql_tool_enabled: bool,
    pub relationship_strategy: RelationshipStrategy,
    pub serving_timeout_secs: u64,
    pub sql_wait_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: None,
            endpoint: None,
            warehouse_id: None,
            token: None,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.2,
            max_tokens: 512,
            max_tool_iterations: 5,
            tool_mode: ToolLoopMode::MultiTurn,
            tools_enabled: true,
            sql_tool_enabled: false,
            relationship_strategy: RelationshipStrategy::ExplicitConstraints,
            serving_timeout_secs: 120,
            sql_wait_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Settings file (if any), then the process environment
    pub fn load(path: Option<&Path>) -> ChatResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ChatResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ChatError::configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ChatError::configuration(format!("Invalid settings file {}: {}", path.display(), e))
        })
    }

    /// Override fields from variables returned by `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> ChatResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DATABRICKS_HOST") {
            self.host = Some(v);
        }
        if let Some(v) = get("DATABRICKS_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = get("DATABRICKS_WAREHOUSE_ID") {
            self.warehouse_id = Some(v);
        }
        if let Some(v) = get("TABLECHAT_ENDPOINT") {
            self.endpoint = Some(v);
        }
        if let Some(v) = get("TABLECHAT_SYSTEM_PROMPT") {
            self.system_prompt = v;
        }
        if let Some(v) = get("TABLECHAT_TEMPERATURE") {
            self.temperature = parse_var("TABLECHAT_TEMPERATURE", &v)?;
        }
        if let Some(v) = get("TABLECHAT_MAX_TOKENS") {
            self.max_tokens = parse_var("TABLECHAT_MAX_TOKENS", &v)?;
        }
        if let Some(v) = get("TABLECHAT_MAX_TOOL_ITERATIONS") {
            self.max_tool_iterations = parse_var("TABLECHAT_MAX_TOOL_ITERATIONS", &v)?;
        }
        if let Some(v) = get("TABLECHAT_TOOL_MODE") {
            self.tool_mode = v.parse()?;
        }
        if let Some(v) = get("TABLECHAT_TOOLS") {
            self.tools_enabled = parse_switch("TABLECHAT_TOOLS", &v)?;
        }
        if let Some(v) = get("TABLECHAT_SQL_TOOL") {
            self.sql_tool_enabled = parse_switch("TABLECHAT_SQL_TOOL", &v)?;
        }
        if let Some(v) = get("TABLECHAT_RELATIONSHIP_STRATEGY") {
            self.relationship_strategy = v.parse()?;
        }
        if let Some(v) = get("TABLECHAT_SERVING_TIMEOUT_SECS") {
            self.serving_timeout_secs = parse_var("TABLECHAT_SERVING_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("TABLECHAT_SQL_WAIT_SECS") {
            self.sql_wait_timeout_secs = parse_var("TABLECHAT_SQL_WAIT_SECS", &v)?;
        }

        debug!(config = ?self.redacted(), "Configuration loaded");
        Ok(())
    }

    pub fn validate(&self) -> ChatResult<()> {
        if self.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
            return Err(ChatError::configuration(
                "workspace host not set (DATABRICKS_HOST)",
            ));
        }
        if self.endpoint.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err(ChatError::configuration(
                "serving endpoint not set (TABLECHAT_ENDPOINT)",
            ));
        }
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(ChatError::configuration(format!(
                "temperature must be within [0, 1], got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(ChatError::configuration("max_tokens must be positive"));
        }
        if self.max_tool_iterations == 0 {
            return Err(ChatError::configuration(
                "max_tool_iterations must be positive",
            ));
        }
        Ok(())
    }

    /// Copy safe to log
    pub fn redacted(&self) -> Self {
        Self {
            token: self.token.as_ref().map(|_| "***".to_string()),
            ..self.clone()
        }
    }
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> ChatResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ChatError::configuration(format!("{} has an invalid value '{}'", key, value)))
}

fn parse_switch(key: &str, value: &str) -> ChatResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ChatError::configuration(format!(
            "{} must be on/off, got '{}'",
            key, value
        ))),
    }
}
