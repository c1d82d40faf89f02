//! Runtime statistics: monotonic counters plus the most recent error.
//!
//! Counters are atomics written from the request path without locking; the
//! last error sits behind a mutex because it pairs a message with a
//! timestamp. Everything is reset when the server stops.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// The most recent failure, overwritten on each new one.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LastError {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Shared counters for one server instance.
#[derive(Debug, Default)]
pub struct ServerStats {
    requests_received: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    tool_calls: AtomicU64,
    tool_time_ms: AtomicU64,
    resource_reads: AtomicU64,
    prompt_gets: AtomicU64,
    sse_connections_total: AtomicU64,
    sse_connections_active: AtomicU64,
    last_error: Mutex<Option<LastError>>,
}

/// Point-in-time copy of the counters, as exposed by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    #[serde(rename = "requestsReceived")]
    pub requests_received: u64,
    #[serde(rename = "requestsSucceeded")]
    pub requests_succeeded: u64,
    #[serde(rename = "requestsFailed")]
    pub requests_failed: u64,
    #[serde(rename = "toolCalls")]
    pub tool_calls: u64,
    #[serde(rename = "toolTimeMs")]
    pub tool_time_ms: u64,
    #[serde(rename = "resourceReads")]
    pub resource_reads: u64,
    #[serde(rename = "promptGets")]
    pub prompt_gets: u64,
    #[serde(rename = "sseConnectionsTotal")]
    pub sse_connections_total: u64,
    #[serde(rename = "sseConnectionsActive")]
    pub sse_connections_active: u64,
    #[serde(rename = "lastError", skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
}

impl ServerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// A request that ended in an error response.
    pub fn record_failure(&self, message: &str) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        self.record_error(message);
    }

    /// Record a failure message without counting a failed request. Used for
    /// tool handler errors, which still answer with a successful response.
    pub fn record_error(&self, message: &str) {
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = Some(LastError {
                message: message.to_string(),
                timestamp: Utc::now(),
            });
        }
    }

    pub fn record_tool_call(&self, elapsed: Duration) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
        self.tool_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_resource_read(&self) {
        self.resource_reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_prompt_get(&self) {
        self.prompt_gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sse_connected(&self) {
        self.sse_connections_total.fetch_add(1, Ordering::Relaxed);
        self.sse_connections_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn sse_disconnected(&self) {
        let _ = self
            .sse_connections_active
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1));
    }

    pub fn active_sse(&self) -> u64 {
        self.sse_connections_active.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            tool_time_ms: self.tool_time_ms.load(Ordering::Relaxed),
            resource_reads: self.resource_reads.load(Ordering::Relaxed),
            prompt_gets: self.prompt_gets.load(Ordering::Relaxed),
            sse_connections_total: self.sse_connections_total.load(Ordering::Relaxed),
            sse_connections_active: self.sse_connections_active.load(Ordering::Relaxed),
            last_error: self.last_error.lock().ok().and_then(|g| g.clone()),
        }
    }

    /// Zero everything. Called when the server stops.
    pub fn reset(&self) {
        self.requests_received.store(0, Ordering::Relaxed);
        self.requests_succeeded.store(0, Ordering::Relaxed);
        self.requests_failed.store(0, Ordering::Relaxed);
        self.tool_calls.store(0, Ordering::Relaxed);
        self.tool_time_ms.store(0, Ordering::Relaxed);
        self.resource_reads.store(0, Ordering::Relaxed);
        self.prompt_gets.store(0, Ordering::Relaxed);
        self.sse_connections_total.store(0, Ordering::Relaxed);
        self.sse_connections_active.store(0, Ordering::Relaxed);
        if let Ok(mut guard) = self.last_error.lock() {
            *guard = None;
        }
    }
}
