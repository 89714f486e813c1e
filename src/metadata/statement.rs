// SPDX-License-Identifier: Apache-2.0

//! SQL statement execution payloads

use serde::Deserialize;
use serde_json::{json, Value};

use tablechat_core::{ChatError, ChatResult, SqlResult, StatementRequest};

/// Accepted `wait_timeout` window of the statements API, in seconds
pub const MIN_WAIT_SECS: u64 = 5;
pub const MAX_WAIT_SECS: u64 = 50;

pub fn clamp_wait(secs: u64) -> u64 {
    secs.clamp(MIN_WAIT_SECS, MAX_WAIT_SECS)
}

/// Body of `POST /api/2.0/sql/statements`
pub fn statement_body(request: &StatementRequest) -> Value {
    json!({
        "statement": request.statement,
        "warehouse_id": request.warehouse_id,
        "catalog": request.catalog,
        "schema": request.schema,
        "wait_timeout": format!("{}s", clamp_wait(request.wait_timeout_secs)),
        "on_wait_timeout": "CANCEL",
        "disposition": "INLINE",
        "format": "JSON_ARRAY",
    })
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    status: Option<StatementStatus>,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultChunk>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    schema: Option<ManifestSchema>,
}

#[derive(Debug, Deserialize)]
struct ManifestSchema {
    #[serde(default)]
    columns: Vec<ManifestColumn>,
}

#[derive(Debug, Deserialize)]
struct ManifestColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultChunk {
    /// `null` for statements that produced no rows
    #[serde(default)]
    data_array: Option<Vec<Vec<Value>>>,
}

/// Turn a statement response into a result set.
///
/// Anything but `SUCCEEDED` is a failure; a missing `data_array` is an
/// empty result.
pub fn parse_statement_response(payload: &Value) -> ChatResult<SqlResult> {
    let response: StatementResponse = serde_json::from_value(payload.clone())
        .map_err(|e| ChatError::response_format(format!("{} ({})", payload, e)))?;

    let status = response
        .status
        .ok_or_else(|| ChatError::response_format(payload.to_string()))?;

    match status.state.as_str() {
        "SUCCEEDED" => {}
        "PENDING" | "RUNNING" => {
            return Err(ChatError::network(
                "statement did not finish within the wait timeout",
            ))
        }
        state => {
            let message = status
                .error
                .map(|e| match (e.error_code, e.message) {
                    (Some(code), Some(msg)) => format!("{}: {}", code, msg),
                    (None, Some(msg)) => msg,
                    (Some(code), None) => code,
                    (None, None) => format!("statement {}", state),
                })
                .unwrap_or_else(|| format!("statement {}", state));
            return Err(ChatError::transport(None, Value::String(message)));
        }
    }

    let columns = response
        .manifest
        .and_then(|m| m.schema)
        .map(|s| s.columns.into_iter().map(|c| c.name).collect())
        .unwrap_or_default();
    let rows = response
        .result
        .and_then(|r| r.data_array)
        .unwrap_or_default();

    Ok(SqlResult::new(columns, rows))
}
