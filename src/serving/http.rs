// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use tablechat_core::{ChatError, ChatRequest, ChatResult, ChatTransport};

use super::wire::encode_request;
use crate::metrics;
use crate::transport::WorkspaceHttp;

// ─── Serving endpoint client ─────────────────────────────────

/// Invokes `serving-endpoints/{endpoint}/invocations` on the workspace
pub struct HttpServingClient {
    http: Arc<WorkspaceHttp>,
    endpoint: String,
    timeout: Duration,
}

impl HttpServingClient {
    pub fn new(http: Arc<WorkspaceHttp>, endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ChatTransport for HttpServingClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &ChatRequest) -> ChatResult<Value> {
        let url = self
            .http
            .url(&["serving-endpoints", &self.endpoint, "invocations"])?;
        let body = encode_request(request);

        debug!(
            endpoint = %self.endpoint,
            messages = request.messages.len(),
            tools = request.has_tools(),
            "Invoking serving endpoint"
        );

        let started = Instant::now();
        let result = self
            .http
            .post_json(url, &body, self.timeout)
            .await
            .and_then(reject_error_payload);
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        metrics::record_model_call(elapsed_ms, result.is_ok());

        if let Err(e) = &result {
            warn!(endpoint = %self.endpoint, elapsed_ms = elapsed_ms as u64, error = %e, "Serving call failed");
        }
        result
    }
}

/// Some gateways answer 2xx with an error object in the body
fn reject_error_payload(payload: Value) -> ChatResult<Value> {
    let is_error = payload.get("error_code").is_some_and(Value::is_string)
        || payload.get("error").is_some_and(Value::is_object);
    if is_error {
        return Err(ChatError::transport(None, payload));
    }
    Ok(payload)
}
