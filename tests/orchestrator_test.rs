// SPDX-License-Identifier: Apache-2.0

//! Tool loop scenarios against scripted model and catalog doubles.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use tablechat_core::{
    ChatError, ChatRequest, ChatResult, ChatTransport, RelationshipStrategy, Role,
    TableDescriptor,
};
use tablechat_lib::chat::{
    ChatOrchestrator, Conversation, OrchestratorSettings, ToolLoopMode, TurnEnd,
    ITERATION_LIMIT_REPLY,
};
use tablechat_lib::metadata::{InMemoryCatalog, MetadataClient};
use tablechat_lib::tools::ToolRegistry;

/// Replays queued payloads; repeats `fallback` once the queue is empty
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<ChatResult<Value>>>,
    fallback: Option<Value>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    fn new(replies: Vec<ChatResult<Value>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    fn repeating(payload: Value) -> Self {
        Self {
            fallback: Some(payload),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: &ChatRequest) -> ChatResult<Value> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        self.fallback
            .clone()
            .ok_or_else(|| ChatError::network("script exhausted"))
    }
}

fn tool_calls(calls: &[(&str, &str, Value)]) -> Value {
    let calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({
                "id": id,
                "type": "function",
                "function": {"name": name, "arguments": args.to_string()}
            })
        })
        .collect();
    json!({"choices": [{"message": {"role": "assistant", "content": null, "tool_calls": calls}}]})
}

fn text(content: &str) -> Value {
    json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
}

fn orders() -> TableDescriptor {
    TableDescriptor {
        catalog: "demo".into(),
        schema: "sales".into(),
        name: "orders".into(),
        table_type: "MANAGED".into(),
        comment: "order records".into(),
        columns: vec![],
    }
}

fn registry(catalog: InMemoryCatalog) -> Arc<ToolRegistry> {
    let client = MetadataClient::new(
        Arc::new(catalog),
        Some("wh-1".into()),
        RelationshipStrategy::ExplicitConstraints,
    );
    Arc::new(ToolRegistry::new(Arc::new(client), false).unwrap())
}

fn orchestrator(
    transport: Arc<ScriptedTransport>,
    tools: Option<Arc<ToolRegistry>>,
    mode: ToolLoopMode,
) -> ChatOrchestrator {
    ChatOrchestrator::new(
        transport,
        tools,
        OrchestratorSettings {
            mode,
            ..OrchestratorSettings::default()
        },
    )
}

#[tokio::test]
async fn list_tables_multi_turn_end_to_end() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(tool_calls(&[(
            "call_1",
            "list_tables",
            json!({"catalog": "demo", "schema": "sales"}),
        )])),
        Ok(text("The demo.sales schema has one table: orders.")),
    ]));
    let orchestrator = orchestrator(
        transport.clone(),
        Some(registry(InMemoryCatalog::new().with_table(orders()))),
        ToolLoopMode::MultiTurn,
    );
    let mut conversation = Conversation::new("You are a helpful assistant.");

    let outcome = orchestrator
        .run_turn(&mut conversation, "list tables in demo.sales")
        .await;

    assert_eq!(outcome.end, TurnEnd::Answered);
    assert_eq!(outcome.round_trips, 2);
    assert_eq!(outcome.reply, "The demo.sales schema has one table: orders.");

    // system, user, assistant(tool_calls), tool, assistant
    let messages = conversation.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[2].tool_calls.as_ref().unwrap()[0].id, "call_1");
    assert_eq!(messages[3].role, Role::Tool);
    assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
    assert!(messages[3]
        .content_str()
        .contains("orders (MANAGED): order records"));

    // the second call saw the tool result and carried the declarations
    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].has_tools());
    let last = requests[1].messages.last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
}

#[tokio::test]
async fn single_shot_returns_tool_text_verbatim() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(tool_calls(&[(
        "call_1",
        "list_tables",
        json!({"catalog": "demo", "schema": "sales"}),
    )]))]));
    let orchestrator = orchestrator(
        transport.clone(),
        Some(registry(InMemoryCatalog::new().with_table(orders()))),
        ToolLoopMode::SingleShot,
    );
    assert_eq!(orchestrator.mode(), ToolLoopMode::SingleShot);
    let mut conversation = Conversation::new("sys");

    let outcome = orchestrator
        .run_turn(&mut conversation, "list tables in demo.sales")
        .await;

    assert_eq!(outcome.end, TurnEnd::ToolOutput);
    assert_eq!(outcome.reply, "Tables in demo.sales:\n\n- orders (MANAGED): order records\n");
    assert_eq!(transport.requests().len(), 1);
    assert_eq!(
        conversation.messages().last().unwrap().content_str(),
        outcome.reply
    );
}

#[tokio::test]
async fn tool_results_keep_request_order_and_ids() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(tool_calls(&[
            ("b-2", "get_table_details", json!({"catalog": "demo", "schema": "sales", "table": "orders"})),
            ("a-1", "list_tables", json!({"catalog": "demo", "schema": "sales"})),
            ("c-3", "drop_everything", json!({})),
        ])),
        Ok(text("done")),
    ]));
    let orchestrator = orchestrator(
        transport.clone(),
        Some(registry(InMemoryCatalog::new().with_table(orders()))),
        ToolLoopMode::MultiTurn,
    );
    let mut conversation = Conversation::new("sys");

    orchestrator.run_turn(&mut conversation, "describe").await;

    let tool_messages: Vec<_> = conversation
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    let ids: Vec<_> = tool_messages
        .iter()
        .map(|m| m.tool_call_id.as_deref().unwrap())
        .collect();
    assert_eq!(ids, vec!["b-2", "a-1", "c-3"]);
    assert!(tool_messages[0].content_str().starts_with("Table: demo.sales.orders"));
    assert_eq!(tool_messages[2].content_str(), "Error: unknown tool 'drop_everything'");

    // all three results were present before the second model call
    let second = &transport.requests()[1];
    let tail: Vec<_> = second.messages[second.messages.len() - 3..]
        .iter()
        .map(|m| m.tool_call_id.clone().unwrap())
        .collect();
    assert_eq!(tail, vec!["b-2", "a-1", "c-3"]);
}

#[tokio::test]
async fn iteration_budget_stops_after_five_calls() {
    let transport = Arc::new(ScriptedTransport::repeating(tool_calls(&[(
        "loop",
        "list_tables",
        json!({"catalog": "demo", "schema": "sales"}),
    )])));
    let orchestrator = orchestrator(
        transport.clone(),
        Some(registry(InMemoryCatalog::new())),
        ToolLoopMode::MultiTurn,
    );
    let mut conversation = Conversation::new("sys");

    let outcome = orchestrator.run_turn(&mut conversation, "loop forever").await;

    assert_eq!(outcome.end, TurnEnd::IterationLimitReached);
    assert_eq!(outcome.reply, ITERATION_LIMIT_REPLY);
    assert_eq!(outcome.round_trips, 5);
    assert_eq!(transport.requests().len(), 5);
    assert_eq!(
        conversation.messages().last().unwrap().content_str(),
        ITERATION_LIMIT_REPLY
    );
}

#[tokio::test]
async fn failed_turn_leaves_one_error_reply() {
    let transport = Arc::new(ScriptedTransport::new(vec![
        Ok(text("first answer")),
        Ok(tool_calls(&[(
            "call_1",
            "list_tables",
            json!({"catalog": "demo", "schema": "sales"}),
        )])),
        Err(ChatError::transport(Some(503), json!({"message": "endpoint scaling"}))),
    ]));
    let orchestrator = orchestrator(
        transport.clone(),
        Some(registry(InMemoryCatalog::new())),
        ToolLoopMode::MultiTurn,
    );
    let mut conversation = Conversation::new("sys");

    orchestrator.run_turn(&mut conversation, "hello").await;
    let before = conversation.messages().to_vec();

    let outcome = orchestrator.run_turn(&mut conversation, "list tables").await;

    assert_eq!(outcome.end, TurnEnd::Failed);
    assert!(outcome.reply.starts_with("Error: Transport error (HTTP 503)"));

    // prior history intact; no half-finished tool messages
    let messages = conversation.messages();
    assert_eq!(&messages[..before.len()], before.as_slice());
    assert_eq!(messages.len(), before.len() + 2);
    assert_eq!(messages[before.len()].content_str(), "list tables");
    assert_eq!(messages[before.len() + 1].content_str(), outcome.reply);
    assert!(messages.iter().all(|m| m.role != Role::Tool));
}

#[tokio::test]
async fn without_registry_turn_is_plain_chat() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({
        "candidates": [{"content": {"parts": [{"text": "Hel"}, {"text": "lo"}]}}]
    }))]));
    let orchestrator = orchestrator(transport.clone(), None, ToolLoopMode::MultiTurn);
    assert!(!orchestrator.tools_enabled());
    let mut conversation = Conversation::new("sys");

    let outcome = orchestrator.run_turn(&mut conversation, "hi").await;

    assert_eq!(outcome.reply, "Hello");
    assert!(!transport.requests()[0].has_tools());
    assert_eq!(conversation.len(), 3);
}

#[tokio::test]
async fn unrecognised_payload_is_reported() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({"data": [1, 2]}))]));
    let orchestrator = orchestrator(transport, None, ToolLoopMode::MultiTurn);
    let mut conversation = Conversation::new("sys");

    let outcome = orchestrator.run_turn(&mut conversation, "hi").await;

    assert_eq!(outcome.end, TurnEnd::Failed);
    assert!(outcome.reply.contains(r#"{"data":[1,2]}"#));
}

#[tokio::test]
async fn empty_content_is_an_empty_answer() {
    let transport = Arc::new(ScriptedTransport::new(vec![Ok(json!({
        "choices": [{"message": {"role": "assistant", "content": null}}]
    }))]));
    let orchestrator = orchestrator(
        transport,
        Some(registry(InMemoryCatalog::new())),
        ToolLoopMode::MultiTurn,
    );
    let mut conversation = Conversation::new("sys");

    let outcome = orchestrator.run_turn(&mut conversation, "hi").await;

    assert_eq!(outcome.end, TurnEnd::Answered);
    assert_eq!(outcome.reply, "");
}
