// SPDX-License-Identifier: Apache-2.0

pub mod conversation;
pub mod orchestrator;

pub use conversation::Conversation;
pub use orchestrator::{
    ChatOrchestrator, OrchestratorSettings, ToolLoopMode, TurnEnd, TurnOutcome, TurnState,
    ITERATION_LIMIT_REPLY,
};
