// SPDX-License-Identifier: Apache-2.0

//! OpenAI-compatible chat payloads
//!
//! Encodes [`ChatRequest`] for the invocations API and decodes the assistant
//! message of a response, tool calls included.

use serde_json::{json, Map, Value};
use tracing::warn;

use tablechat_core::{ChatError, ChatRequest, ChatResult, Message, ToolCallRequest, ToolDefinition};

use super::extract::{extract_text, join_parts};

/// What the model answered in tool mode
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantTurn {
    pub fn requests_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

pub fn encode_request(request: &ChatRequest) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(encode_message).collect();

    let mut body = json!({
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });

    if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
        body["tools"] = Value::Array(tools.iter().map(encode_tool).collect());
        if let Some(choice) = request.tool_choice {
            body["tool_choice"] = Value::String(choice.as_str().to_string());
        }
    }
    body
}

fn encode_message(message: &Message) -> Value {
    let mut out = json!({
        "role": message.role.as_str(),
        "content": message.content,
    });
    if let Some(id) = &message.tool_call_id {
        out["tool_call_id"] = Value::String(id.clone());
    }
    if let Some(calls) = message.tool_calls.as_ref().filter(|c| !c.is_empty()) {
        out["tool_calls"] = Value::Array(
            calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": Value::Object(call.arguments.clone()).to_string(),
                        }
                    })
                })
                .collect(),
        );
    }
    out
}

fn encode_tool(tool: &ToolDefinition) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters_schema(),
        }
    })
}

/// Decode the assistant message of a tool-mode response.
///
/// Payloads without a `choices[0].message` object fall back to plain text
/// extraction and never carry tool calls.
pub fn parse_assistant_turn(payload: &Value) -> ChatResult<AssistantTurn> {
    let Some(message) = payload.pointer("/choices/0/message").filter(|m| m.is_object()) else {
        return Ok(AssistantTurn {
            content: Some(extract_text(payload)?),
            tool_calls: Vec::new(),
        });
    };

    let content = match message.get("content") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(parts @ Value::Array(_)) => join_parts(parts),
        _ => None,
    };

    let mut tool_calls = Vec::new();
    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        for (index, call) in calls.iter().enumerate() {
            tool_calls.push(decode_tool_call(index, call)?);
        }
    }

    Ok(AssistantTurn {
        content,
        tool_calls,
    })
}

fn decode_tool_call(index: usize, call: &Value) -> ChatResult<ToolCallRequest> {
    let name = call
        .pointer("/function/name")
        .and_then(Value::as_str)
        .ok_or_else(|| ChatError::response_format(call.to_string()))?;

    let id = call
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}_{}", index, uuid::Uuid::new_v4().simple()));

    let arguments = match call.pointer("/function/arguments") {
        Some(Value::String(raw)) if raw.trim().is_empty() => Map::new(),
        Some(Value::String(raw)) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                // The registry reports missing parameters back to the model.
                warn!(tool = name, "Tool call arguments are not a JSON object");
                Map::new()
            }
        },
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };

    Ok(ToolCallRequest::new(id, name, arguments))
}
