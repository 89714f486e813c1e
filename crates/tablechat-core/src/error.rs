// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for tablechat
//!
//! Serving, catalog, and SQL failures are all mapped onto [`ChatError`] so the
//! orchestrator can turn any of them into a single user-visible reply.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for every fallible operation in the crate family
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
pub enum ChatError {
    /// A required setting is missing or out of range.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The credential provider could not supply a usable credential.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Non-2xx status, error-shaped payload, or network failure.
    ///
    /// `detail` holds the endpoint's error body, as parsed JSON when it was
    /// valid JSON and as a JSON string otherwise.
    #[error("{}", transport_message(.status, .detail))]
    Transport {
        status: Option<u16>,
        detail: serde_json::Value,
    },

    /// The serving layer answered with a shape we do not recognise.
    #[error("Unrecognised response format: {payload}")]
    ResponseFormat { payload: String },

    /// Catalog, table, or SQL failure; `target` is the qualified name involved.
    #[error("Metadata error for '{target}': {message}")]
    Metadata { target: String, message: String },

    /// A tool failed. Never leaves the tool registry.
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },
}

fn transport_message(status: &Option<u16>, detail: &serde_json::Value) -> String {
    let detail = match detail {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    match status {
        Some(code) => format!("Transport error (HTTP {}): {}", code, detail),
        None => format!("Transport error: {}", detail),
    }
}

impl ChatError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration { message: msg.into() }
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication { message: msg.into() }
    }

    pub fn transport(status: Option<u16>, detail: serde_json::Value) -> Self {
        Self::Transport { status, detail }
    }

    /// Transport failure with no HTTP status (connect error, timeout, ...).
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            detail: serde_json::Value::String(msg.into()),
        }
    }

    pub fn response_format(payload: impl Into<String>) -> Self {
        Self::ResponseFormat { payload: payload.into() }
    }

    pub fn metadata(target: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Metadata {
            target: target.into(),
            message: msg.into(),
        }
    }

    pub fn tool_execution(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    /// Message without the variant prefix, used when an error is rendered
    /// as conversational text.
    pub fn message(&self) -> String {
        match self {
            Self::Configuration { message }
            | Self::Authentication { message }
            | Self::Metadata { message, .. }
            | Self::ToolExecution { message, .. } => message.clone(),
            Self::ResponseFormat { payload } => {
                format!("unrecognised response format: {}", payload)
            }
            Self::Transport { .. } => self.to_string(),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Result type alias used across the workspace
pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transport_display_uses_structured_detail() {
        let err = ChatError::transport(Some(403), json!({"error_code": "PERMISSION_DENIED"}));
        assert_eq!(
            err.to_string(),
            r#"Transport error (HTTP 403): {"error_code":"PERMISSION_DENIED"}"#
        );
    }

    #[test]
    fn transport_display_uses_raw_text() {
        let err = ChatError::network("connection refused");
        assert_eq!(err.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn metadata_display_names_target() {
        let err = ChatError::metadata("demo.sales.orders", "TABLE_DOES_NOT_EXIST");
        assert_eq!(
            err.to_string(),
            "Metadata error for 'demo.sales.orders': TABLE_DOES_NOT_EXIST"
        );
        assert_eq!(err.message(), "TABLE_DOES_NOT_EXIST");
    }

    #[test]
    fn errors_serialize_with_variant_tag() {
        let err = ChatError::configuration("resource id not set");
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"Configuration": {"message": "resource id not set"}})
        );
    }
}
