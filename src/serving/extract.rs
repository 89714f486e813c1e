// SPDX-License-Identifier: Apache-2.0

//! Text extraction from serving responses
//!
//! Endpoints answer in several shapes. Each [`ExtractionStrategy`] recognises
//! exactly one of them; [`extract_text`] tries them in [`STRATEGIES`] order
//! and fails with `ResponseFormat` when none matches.

use serde_json::Value;

use tablechat_core::{ChatError, ChatResult};

/// One recognised response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// The payload itself is a JSON string
    DirectString,
    /// `choices[0].message.content` as a string
    ChatMessageContent,
    /// `choices[0].text`
    CompletionText,
    /// A list of `{ "text": ... }` parts, joined in order
    ContentParts,
    /// A string under a well-known top-level key
    FlatKey(&'static str),
}

/// Priority order
pub const STRATEGIES: &[ExtractionStrategy] = &[
    ExtractionStrategy::DirectString,
    ExtractionStrategy::ChatMessageContent,
    ExtractionStrategy::CompletionText,
    ExtractionStrategy::ContentParts,
    ExtractionStrategy::FlatKey("output_text"),
    ExtractionStrategy::FlatKey("generated_text"),
    ExtractionStrategy::FlatKey("text"),
    ExtractionStrategy::FlatKey("response"),
];

impl ExtractionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractionStrategy::DirectString => "direct_string",
            ExtractionStrategy::ChatMessageContent => "chat_message_content",
            ExtractionStrategy::CompletionText => "completion_text",
            ExtractionStrategy::ContentParts => "content_parts",
            ExtractionStrategy::FlatKey(key) => *key,
        }
    }

    /// `Some(text)` when the payload has this strategy's shape
    pub fn apply(&self, payload: &Value) -> Option<String> {
        match self {
            ExtractionStrategy::DirectString => payload.as_str().map(str::to_string),
            ExtractionStrategy::ChatMessageContent => payload
                .pointer("/choices/0/message/content")
                .and_then(Value::as_str)
                .map(str::to_string),
            ExtractionStrategy::CompletionText => payload
                .pointer("/choices/0/text")
                .and_then(Value::as_str)
                .map(str::to_string),
            ExtractionStrategy::ContentParts => content_parts(payload),
            ExtractionStrategy::FlatKey(key) => payload
                .as_object()
                .and_then(|obj| obj.get(*key))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// Gemini-style `candidates[0].content.parts`, or a chat message whose
/// `content` is a list of parts.
fn content_parts(payload: &Value) -> Option<String> {
    let parts = payload
        .pointer("/candidates/0/content/parts")
        .or_else(|| payload.pointer("/choices/0/message/content"))?;
    join_parts(parts)
}

/// Concatenate the `text` fragments of a parts array, in order
pub fn join_parts(parts: &Value) -> Option<String> {
    let parts = parts.as_array()?;
    let mut text = String::new();
    for part in parts {
        if let Some(fragment) = part.get("text").and_then(Value::as_str) {
            text.push_str(fragment);
        }
    }
    Some(text)
}

/// The first strategy that matches, with its text
pub fn match_strategy(payload: &Value) -> Option<(ExtractionStrategy, String)> {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy.apply(payload).map(|text| (*strategy, text)))
}

pub fn extract_text(payload: &Value) -> ChatResult<String> {
    match match_strategy(payload) {
        Some((strategy, text)) => {
            tracing::debug!(strategy = strategy.name(), "Extracted response text");
            Ok(text)
        }
        None => Err(ChatError::response_format(payload.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_string() {
        assert_eq!(extract_text(&json!("hello")).unwrap(), "hello");
    }

    #[test]
    fn chat_completion_shape() {
        let payload = json!({"choices": [{"message": {"role": "assistant", "content": "hi"}}]});
        assert_eq!(
            match_strategy(&payload).unwrap(),
            (ExtractionStrategy::ChatMessageContent, "hi".to_string())
        );
    }

    #[test]
    fn completion_text_shape() {
        let payload = json!({"choices": [{"text": "legacy"}]});
        assert_eq!(extract_text(&payload).unwrap(), "legacy");
    }

    #[test]
    fn parts_are_joined_in_order() {
        let payload = json!({
            "candidates": [{"content": {"parts": [{"text": "a"}, {"inline": 1}, {"text": "b"}]}}]
        });
        assert_eq!(
            match_strategy(&payload).unwrap(),
            (ExtractionStrategy::ContentParts, "ab".to_string())
        );

        let list_content = json!({
            "choices": [{"message": {"content": [{"type": "text", "text": "x"}, {"type": "text", "text": "y"}]}}]
        });
        assert_eq!(extract_text(&list_content).unwrap(), "xy");
    }

    #[test]
    fn flat_keys_in_priority_order() {
        let payload = json!({"response": "r", "generated_text": "g"});
        assert_eq!(
            match_strategy(&payload).unwrap(),
            (ExtractionStrategy::FlatKey("generated_text"), "g".to_string())
        );
        assert_eq!(extract_text(&json!({"output_text": "o"})).unwrap(), "o");
    }

    #[test]
    fn non_string_flat_key_does_not_match() {
        let payload = json!({"text": 42});
        let err = extract_text(&payload).unwrap_err();
        assert_eq!(err, ChatError::response_format(r#"{"text":42}"#));
    }

    #[test]
    fn extraction_is_idempotent() {
        let payload = json!({"choices": [{"message": {"content": "same"}}]});
        assert_eq!(extract_text(&payload).unwrap(), extract_text(&payload).unwrap());
    }
}
