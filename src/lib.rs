// SPDX-License-Identifier: Apache-2.0

// tablechat - conversational Unity Catalog explorer
// Core library

pub mod chat;
pub mod config;
pub mod credentials;
pub mod metadata;
pub mod metrics;
pub mod observability;
pub mod repl;
pub mod serving;
pub mod tools;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use tablechat_core::{CatalogBackend, ChatResult, ChatTransport};

use chat::{ChatOrchestrator, Conversation, OrchestratorSettings};
use config::AppConfig;
use credentials::{
    CachedCredentialProvider, CredentialProvider, KeyringTokenProvider, StaticTokenProvider,
};
use metadata::{MetadataClient, UnityCatalogBackend};
use serving::HttpServingClient;
use tools::ToolRegistry;
use transport::WorkspaceHttp;

/// How long a resolved `Authorization` header is reused
const CREDENTIAL_TTL: Duration = Duration::from_secs(300);

/// One chat session with its collaborators
pub struct AppState {
    pub config: AppConfig,
    pub orchestrator: ChatOrchestrator,
    pub conversation: Conversation,
}

impl AppState {
    /// Wire the workspace-backed serving client and catalog from `config`
    pub fn from_config(config: AppConfig) -> ChatResult<Self> {
        config.validate()?;
        let host = config.host.clone().unwrap_or_default();
        let endpoint = config.endpoint.clone().unwrap_or_default();

        let source: Arc<dyn CredentialProvider> = match config.token.as_deref() {
            Some(token) => Arc::new(StaticTokenProvider::new(Some(token))),
            None => Arc::new(KeyringTokenProvider::new(&host)),
        };
        let credentials = Arc::new(CachedCredentialProvider::new(source, CREDENTIAL_TTL));
        let http = Arc::new(WorkspaceHttp::new(&host, credentials)?);

        let transport = Arc::new(HttpServingClient::new(
            Arc::clone(&http),
            endpoint,
            Duration::from_secs(config.serving_timeout_secs),
        ));
        let catalog = Arc::new(UnityCatalogBackend::new(http));

        Self::with_components(config, transport, catalog)
    }

    /// Wire explicit collaborators; the catalog is unused when tools are off
    pub fn with_components(
        config: AppConfig,
        transport: Arc<dyn ChatTransport>,
        catalog: Arc<dyn CatalogBackend>,
    ) -> ChatResult<Self> {
        let tools = if config.tools_enabled {
            let client = MetadataClient::new(
                catalog,
                config.warehouse_id.clone(),
                config.relationship_strategy,
            )
            .with_sql_wait(config.sql_wait_timeout_secs);
            Some(Arc::new(ToolRegistry::new(
                Arc::new(client),
                config.sql_tool_enabled,
            )?))
        } else {
            None
        };

        let orchestrator =
            ChatOrchestrator::new(transport, tools, OrchestratorSettings::from(&config));
        let conversation = Conversation::new(config.system_prompt.clone());

        info!(
            endpoint = config.endpoint.as_deref().unwrap_or(""),
            tools = orchestrator.tools_enabled(),
            mode = %orchestrator.mode(),
            strategy = %config.relationship_strategy,
            "Chat session ready"
        );

        Ok(Self {
            config,
            orchestrator,
            conversation,
        })
    }

    /// Replace the system prompt of the running conversation
    pub fn set_system_prompt(&mut self, prompt: &str) {
        self.config.system_prompt = prompt.to_string();
        self.conversation.set_system_prompt(prompt);
    }
}
