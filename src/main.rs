// SPDX-License-Identifier: Apache-2.0

//! tablechat CLI
//!
//! Usage:
//!   tablechat [--config settings.json] [--endpoint NAME] [--single-shot]
//!             [--no-tools] [--sql-tool] [--strategy heuristic] [--log-dir DIR]
//!   echo "$TOKEN" | tablechat --store-token

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader};

use tablechat_core::{ChatError, ChatResult, RelationshipStrategy};
use tablechat_lib::chat::ToolLoopMode;
use tablechat_lib::config::AppConfig;
use tablechat_lib::credentials::KeyringTokenProvider;
use tablechat_lib::{observability, repl, AppState};

#[derive(Parser)]
#[command(name = "tablechat")]
#[command(about = "Chat with a serving endpoint that can explore Unity Catalog metadata")]
#[command(version)]
struct Cli {
    /// JSON settings file; environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serving endpoint name
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Return tool output directly instead of a second model call
    #[arg(long)]
    single_shot: bool,

    /// Plain chat without catalog tools
    #[arg(long)]
    no_tools: bool,

    /// Expose the read-only execute_sql tool
    #[arg(long)]
    sql_tool: bool,

    /// Relationship discovery strategy
    #[arg(long)]
    strategy: Option<StrategyArg>,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Read an access token from stdin, save it in the OS keyring for the
    /// workspace host, and exit
    #[arg(long)]
    store_token: bool,
}

#[derive(Clone, ValueEnum)]
enum StrategyArg {
    Explicit,
    Heuristic,
}

impl From<StrategyArg> for RelationshipStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Explicit => RelationshipStrategy::ExplicitConstraints,
            StrategyArg::Heuristic => RelationshipStrategy::Heuristic,
        }
    }
}

impl Cli {
    fn apply(self, config: &mut AppConfig) {
        if let Some(endpoint) = self.endpoint {
            config.endpoint = Some(endpoint);
        }
        if self.single_shot {
            config.tool_mode = ToolLoopMode::SingleShot;
        }
        if self.no_tools {
            config.tools_enabled = false;
        }
        if self.sql_tool {
            config.sql_tool_enabled = true;
        }
        if let Some(strategy) = self.strategy {
            config.relationship_strategy = strategy.into();
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let log_dir = observability::init_tracing(cli.log_dir.as_deref());

    let mut config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let store_token = cli.store_token;
    cli.apply(&mut config);

    if store_token {
        return match store_keyring_token(&config).await {
            Ok(host) => {
                eprintln!("Token stored in the keyring for {}", host);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        };
    }

    let mut state = match AppState::from_config(config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "tablechat | endpoint: {} | tools: {} | logs: {}",
        state.config.endpoint.as_deref().unwrap_or("-"),
        if state.orchestrator.tools_enabled() {
            state.orchestrator.mode().as_str()
        } else {
            "off"
        },
        log_dir.display()
    );
    eprintln!("Type /help for commands, /quit to exit\n");

    let input = BufReader::new(tokio::io::stdin());
    match repl::run(&mut state, input, tokio::io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("I/O error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn store_keyring_token(config: &AppConfig) -> ChatResult<String> {
    let host = config
        .host
        .as_deref()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ChatError::configuration("workspace host not set (DATABRICKS_HOST)"))?;

    let mut token = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut token)
        .await
        .map_err(|e| ChatError::configuration(format!("could not read token: {}", e)))?;

    KeyringTokenProvider::new(host).store(&token)?;
    Ok(host.to_string())
}
