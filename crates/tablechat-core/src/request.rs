// SPDX-License-Identifier: Apache-2.0

//! Serving request model

use serde::{Deserialize, Serialize};

use crate::types::{Message, ToolDefinition};

/// How the model may use the attached tools
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    #[default]
    Auto,
    None,
    Required,
}

impl ToolChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolChoice::Auto => "auto",
            ToolChoice::None => "none",
            ToolChoice::Required => "required",
        }
    }
}

/// One call to the serving endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    /// In [0, 1]
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>, temperature: f32, max_tokens: u32) -> Self {
        Self {
            messages,
            temperature: temperature.clamp(0.0, 1.0),
            max_tokens: max_tokens.max(1),
            tools: None,
            tool_choice: None,
        }
    }

    /// Attach tool declarations with `auto` tool choice
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        if !tools.is_empty() {
            self.tools = Some(tools);
            self.tool_choice = Some(ToolChoice::Auto);
        }
        self
    }

    pub fn has_tools(&self) -> bool {
        self.tools.as_ref().is_some_and(|t| !t.is_empty())
    }
}
