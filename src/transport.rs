// SPDX-License-Identifier: Apache-2.0

//! Authenticated JSON-over-HTTP calls to the workspace
//!
//! Shared by the serving client and the Unity Catalog backend. Each call
//! carries its own timeout; nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use tracing::debug;
use url::Url;

use tablechat_core::{ChatError, ChatResult};

use crate::credentials::CredentialProvider;

pub struct WorkspaceHttp {
    client: Client,
    base: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl WorkspaceHttp {
    pub fn new(host: &str, credentials: Arc<dyn CredentialProvider>) -> ChatResult<Self> {
        let normalized = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        let base = Url::parse(normalized.trim_end_matches('/')).map_err(|e| {
            ChatError::configuration(format!("Invalid workspace host '{}': {}", host, e))
        })?;

        Ok(Self {
            client: Client::new(),
            base,
            credentials,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Base URL extended with `segments`, each percent-encoded
    pub fn url(&self, segments: &[&str]) -> ChatResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ChatError::configuration("workspace host cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json(&self, url: Url, query: &[(&str, &str)], timeout: Duration) -> ChatResult<Value> {
        debug!(%url, "GET");
        let request = self.client.get(url).query(query);
        self.send(request, timeout).await
    }

    pub async fn post_json(&self, url: Url, body: &Value, timeout: Duration) -> ChatResult<Value> {
        debug!(%url, "POST");
        let request = self.client.post(url).json(body);
        self.send(request, timeout).await
    }

    async fn send(&self, request: RequestBuilder, timeout: Duration) -> ChatResult<Value> {
        let authorization = self.credentials.authorization()?;

        let response = request
            .header("Authorization", authorization.expose().as_str())
            .header("Content-Type", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChatError::network(format!("request timed out after {}s", timeout.as_secs()))
                } else {
                    ChatError::network(format!("request failed: {}", e))
                }
            })?;

        if response.status() == StatusCode::UNAUTHORIZED {
            debug!("Workspace rejected the credential");
            self.credentials.invalidate();
        }
        read_json(response).await
    }
}

async fn read_json(response: Response) -> ChatResult<Value> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ChatError::network(format!("failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(ChatError::transport(Some(status.as_u16()), error_detail(&body)));
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    // A non-JSON success body is kept as a string so callers can still try
    // to read it as a plain-text completion.
    Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
}

/// Error body as JSON when it parses, raw text otherwise
pub fn error_detail(body: &str) -> Value {
    serde_json::from_str::<Value>(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

/// Human-readable message from a workspace error payload
pub fn error_message(detail: &Value) -> Option<String> {
    detail["message"]
        .as_str()
        .or_else(|| detail["error"]["message"].as_str())
        .or_else(|| detail["error"].as_str())
        .map(str::to_string)
}
