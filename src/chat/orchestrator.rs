// SPDX-License-Identifier: Apache-2.0

//! Turn orchestration
//!
//! One user message runs one turn: model call, then zero or more rounds of
//! tool execution and model calls, strictly in sequence. The conversation is
//! only touched once the turn has ended.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use tablechat_core::{ChatError, ChatRequest, ChatResult, ChatTransport, Message};

use super::conversation::Conversation;
use crate::config::AppConfig;
use crate::metrics;
use crate::serving::{extract_text, parse_assistant_turn};
use crate::tools::ToolRegistry;

/// Reply when the round-trip budget runs out
pub const ITERATION_LIMIT_REPLY: &str = "Sorry, I could not complete this request within the allowed number of tool calls. \
Please try a more specific question.";

/// What happens after the first round of tool calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolLoopMode {
    /// Tool results go back to the model for a synthesized answer
    #[default]
    MultiTurn,
    /// Tool results are the answer; no second model call
    SingleShot,
}

impl ToolLoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolLoopMode::MultiTurn => "multi_turn",
            ToolLoopMode::SingleShot => "single_shot",
        }
    }
}

impl fmt::Display for ToolLoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolLoopMode {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "multi_turn" | "multi" => Ok(ToolLoopMode::MultiTurn),
            "single_shot" | "single" => Ok(ToolLoopMode::SingleShot),
            other => Err(ChatError::configuration(format!(
                "unknown tool loop mode '{}'",
                other
            ))),
        }
    }
}

/// States of one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingModel,
    ModelRespondedWithText,
    ModelRequestedTools,
    ToolsExecuting,
    IterationLimitReached,
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEnd {
    /// The model answered with text
    Answered,
    /// Single-shot mode returned the tool outputs
    ToolOutput,
    /// Budget exhausted; the fixed apology was returned
    IterationLimitReached,
    /// A call failed; the reply is the error text
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub reply: String,
    pub end: TurnEnd,
    /// Model calls made during the turn
    pub round_trips: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Maximum model calls per turn in tool mode
    pub max_iterations: usize,
    pub mode: ToolLoopMode,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 512,
            max_iterations: 5,
            mode: ToolLoopMode::MultiTurn,
        }
    }
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_iterations: config.max_tool_iterations,
            mode: config.tool_mode,
        }
    }
}

/// Scratch state of a running turn
struct Turn {
    messages: Vec<Message>,
    /// Where the turn's own messages start
    first_new: usize,
    state: TurnState,
    round_trips: usize,
}

impl Turn {
    fn new(conversation: &Conversation, input: &str) -> Self {
        let mut messages = conversation.messages().to_vec();
        let first_new = messages.len();
        messages.push(Message::user(input));
        Self {
            messages,
            first_new,
            state: TurnState::AwaitingModel,
            round_trips: 0,
        }
    }

    fn enter(&mut self, next: TurnState) {
        debug!(from = ?self.state, to = ?next, round_trips = self.round_trips, "Turn transition");
        self.state = next;
    }

    fn into_new_messages(mut self) -> Vec<Message> {
        self.messages.split_off(self.first_new)
    }
}

pub struct ChatOrchestrator {
    transport: Arc<dyn ChatTransport>,
    tools: Option<Arc<ToolRegistry>>,
    settings: OrchestratorSettings,
}

impl ChatOrchestrator {
    /// Without a registry every turn is a single plain chat call
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        tools: Option<Arc<ToolRegistry>>,
        settings: OrchestratorSettings,
    ) -> Self {
        let settings = OrchestratorSettings {
            max_iterations: settings.max_iterations.max(1),
            ..settings
        };
        Self {
            transport,
            tools,
            settings,
        }
    }

    pub fn mode(&self) -> ToolLoopMode {
        self.settings.mode
    }

    pub fn tools_enabled(&self) -> bool {
        self.tools.is_some()
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Run one user turn to completion.
    ///
    /// On success every message of the turn is appended, tool messages
    /// included. On failure only the user message and an `Error: ...` reply
    /// are appended.
    pub async fn run_turn(&self, conversation: &mut Conversation, input: &str) -> TurnOutcome {
        let mut turn = Turn::new(conversation, input);

        let result = match &self.tools {
            Some(registry) => self.tool_loop(registry, &mut turn).await,
            None => self.plain_call(&mut turn).await,
        };
        let round_trips = turn.round_trips;

        match result {
            Ok((reply, end)) => {
                turn.messages.push(Message::assistant(reply.clone()));
                conversation.commit(turn.into_new_messages());
                info!(round_trips, end = ?end, "Turn finished");
                TurnOutcome {
                    reply,
                    end,
                    round_trips,
                }
            }
            Err(e) => {
                error!(round_trips, error = %e, "Turn failed");
                metrics::record_turn_failure();
                let reply = format!("Error: {}", e);
                conversation.commit(vec![Message::user(input), Message::assistant(reply.clone())]);
                TurnOutcome {
                    reply,
                    end: TurnEnd::Failed,
                    round_trips,
                }
            }
        }
    }

    async fn plain_call(&self, turn: &mut Turn) -> ChatResult<(String, TurnEnd)> {
        let request = ChatRequest::new(
            turn.messages.clone(),
            self.settings.temperature,
            self.settings.max_tokens,
        );
        let payload = self.transport.send(&request).await?;
        turn.round_trips += 1;

        let text = extract_text(&payload)?;
        turn.enter(TurnState::ModelRespondedWithText);
        Ok((text, TurnEnd::Answered))
    }

    async fn tool_loop(&self, registry: &ToolRegistry, turn: &mut Turn) -> ChatResult<(String, TurnEnd)> {
        let definitions = registry.definitions();

        loop {
            if turn.round_trips >= self.settings.max_iterations {
                turn.enter(TurnState::IterationLimitReached);
                warn!(
                    max_iterations = self.settings.max_iterations,
                    "Tool loop budget exhausted"
                );
                metrics::record_iteration_limit();
                return Ok((ITERATION_LIMIT_REPLY.to_string(), TurnEnd::IterationLimitReached));
            }

            let request = ChatRequest::new(
                turn.messages.clone(),
                self.settings.temperature,
                self.settings.max_tokens,
            )
            .with_tools(definitions.clone());
            let payload = self.transport.send(&request).await?;
            turn.round_trips += 1;

            let assistant = parse_assistant_turn(&payload)?;
            if !assistant.requests_tools() {
                turn.enter(TurnState::ModelRespondedWithText);
                return Ok((assistant.content.unwrap_or_default(), TurnEnd::Answered));
            }

            turn.enter(TurnState::ModelRequestedTools);
            turn.messages.push(Message::assistant_tool_calls(
                assistant.content.clone(),
                assistant.tool_calls.clone(),
            ));

            turn.enter(TurnState::ToolsExecuting);
            let mut outputs = Vec::with_capacity(assistant.tool_calls.len());
            for call in &assistant.tool_calls {
                debug!(tool = %call.name, id = %call.id, "Executing tool call");
                let output = registry.execute(&call.name, &call.arguments).await;
                turn.messages.push(Message::tool(call.id.clone(), output.clone()));
                outputs.push(output);
            }

            if self.settings.mode == ToolLoopMode::SingleShot {
                return Ok((outputs.join("\n\n"), TurnEnd::ToolOutput));
            }
            turn.enter(TurnState::AwaitingModel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing() {
        assert_eq!("multi_turn".parse::<ToolLoopMode>().unwrap(), ToolLoopMode::MultiTurn);
        assert_eq!("Single-Shot".parse::<ToolLoopMode>().unwrap(), ToolLoopMode::SingleShot);
        assert!("both".parse::<ToolLoopMode>().unwrap_err().is_configuration());
        assert_eq!(
            serde_json::to_string(&ToolLoopMode::SingleShot).unwrap(),
            "\"single_shot\""
        );
    }

    #[test]
    fn settings_follow_config() {
        let config = AppConfig {
            max_tool_iterations: 3,
            tool_mode: ToolLoopMode::SingleShot,
            ..AppConfig::default()
        };
        let settings = OrchestratorSettings::from(&config);
        assert_eq!(settings.max_iterations, 3);
        assert_eq!(settings.mode, ToolLoopMode::SingleShot);
    }
}
