// SPDX-License-Identifier: Apache-2.0

//! Lightweight in-process counters for model calls and tool executions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use serde::Serialize;

#[derive(Default)]
struct ChatMetrics {
    model_calls: AtomicU64,
    model_failures: AtomicU64,
    model_duration_total_ms: AtomicU64,
    model_duration_max_ms: AtomicU64,
    tool_calls: AtomicU64,
    tool_failures: AtomicU64,
    iteration_limits: AtomicU64,
    turn_failures: AtomicU64,
}

static CHAT_METRICS: OnceLock<ChatMetrics> = OnceLock::new();

fn metrics() -> &'static ChatMetrics {
    CHAT_METRICS.get_or_init(ChatMetrics::default)
}

pub fn record_model_call(duration_ms: f64, success: bool) {
    let duration_ms = duration_ms.max(0.0) as u64;
    let metrics = metrics();
    metrics.model_calls.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.model_failures.fetch_add(1, Ordering::Relaxed);
    }
    metrics
        .model_duration_total_ms
        .fetch_add(duration_ms, Ordering::Relaxed);
    metrics
        .model_duration_max_ms
        .fetch_max(duration_ms, Ordering::Relaxed);
}

pub fn record_tool_call(success: bool) {
    let metrics = metrics();
    metrics.tool_calls.fetch_add(1, Ordering::Relaxed);
    if !success {
        metrics.tool_failures.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn record_iteration_limit() {
    metrics().iteration_limits.fetch_add(1, Ordering::Relaxed);
}

pub fn record_turn_failure() {
    metrics().turn_failures.fetch_add(1, Ordering::Relaxed);
}

#[derive(Debug, Serialize)]
pub struct ChatMetricsSnapshot {
    pub model_calls: u64,
    pub model_failures: u64,
    pub model_avg_ms: Option<f64>,
    pub model_max_ms: Option<u64>,
    pub tool_calls: u64,
    pub tool_failures: u64,
    pub iteration_limits: u64,
    pub turn_failures: u64,
}

pub fn snapshot() -> ChatMetricsSnapshot {
    let metrics = metrics();
    let model_calls = metrics.model_calls.load(Ordering::Relaxed);
    let duration_total = metrics.model_duration_total_ms.load(Ordering::Relaxed);
    let max_ms = metrics.model_duration_max_ms.load(Ordering::Relaxed);

    ChatMetricsSnapshot {
        model_calls,
        model_failures: metrics.model_failures.load(Ordering::Relaxed),
        model_avg_ms: (model_calls > 0).then(|| duration_total as f64 / model_calls as f64),
        model_max_ms: (max_ms > 0).then_some(max_ms),
        tool_calls: metrics.tool_calls.load(Ordering::Relaxed),
        tool_failures: metrics.tool_failures.load(Ordering::Relaxed),
        iteration_limits: metrics.iteration_limits.load(Ordering::Relaxed),
        turn_failures: metrics.turn_failures.load(Ordering::Relaxed),
    }
}
