// SPDX-License-Identifier: Apache-2.0

//! Line-oriented chat loop

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::metrics;
use crate::AppState;

const HELP: &str = "Commands:
  /clear          Start a new conversation
  /system <text>  Replace the system prompt
  /mode           Show the tool loop mode
  /stats          Show call counters
  /help           Show this help
  /quit           Exit
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Message(String),
    Clear,
    System(String),
    Mode,
    Stats,
    Help,
    Quit,
    Unknown(String),
}

/// `None` for blank lines
pub fn parse_line(line: &str) -> Option<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if !line.starts_with('/') {
        return Some(ReplCommand::Message(line.to_string()));
    }

    let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let command = match command {
        "/clear" => ReplCommand::Clear,
        "/system" => ReplCommand::System(rest.trim().to_string()),
        "/mode" => ReplCommand::Mode,
        "/stats" => ReplCommand::Stats,
        "/help" | "/h" => ReplCommand::Help,
        "/quit" | "/exit" | "/q" => ReplCommand::Quit,
        other => ReplCommand::Unknown(other.to_string()),
    };
    Some(command)
}

/// Read lines from `input` until EOF or `/quit`, writing replies to `output`
pub async fn run<R, W>(state: &mut AppState, input: R, mut output: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    loop {
        output.write_all(b"you> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(command) = parse_line(&line) else {
            continue;
        };

        let text = match command {
            ReplCommand::Quit => break,
            ReplCommand::Message(message) => {
                let outcome = state
                    .orchestrator
                    .run_turn(&mut state.conversation, &message)
                    .await;
                format!("assistant> {}\n", outcome.reply)
            }
            ReplCommand::Clear => {
                state.conversation.clear();
                info!("Conversation cleared");
                "Conversation cleared.\n".to_string()
            }
            ReplCommand::System(prompt) if prompt.is_empty() => {
                format!("System prompt: {}\n", state.conversation.system_prompt())
            }
            ReplCommand::System(prompt) => {
                state.set_system_prompt(&prompt);
                "System prompt updated.\n".to_string()
            }
            ReplCommand::Mode => {
                if state.orchestrator.tools_enabled() {
                    format!("Tool loop: {}\n", state.orchestrator.mode())
                } else {
                    "Tools disabled (plain chat).\n".to_string()
                }
            }
            ReplCommand::Stats => {
                let snapshot = metrics::snapshot();
                let json = serde_json::to_string_pretty(&snapshot).map_err(io::Error::other)?;
                format!("{}\n", json)
            }
            ReplCommand::Help => HELP.to_string(),
            ReplCommand::Unknown(command) => {
                format!("Unknown command {}. Type /help for commands.\n", command)
            }
        };

        output.write_all(text.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await
}
