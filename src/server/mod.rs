//! Server assembly.
//!
//! The [`ServerBuilder`] collects capabilities, middleware, hooks, and a
//! transport choice, then produces a [`McpServer`] wrapping exactly one
//! transport. Lifecycle and statistics live here; request routing lives in
//! [`crate::protocol::Router`].

pub mod builder;
pub mod hooks;
pub mod middleware;
pub mod registry;
pub mod schema;
pub mod stats;

pub use builder::{ServerBuilder, ValidationReport, DEFAULT_BIND_ADDRESS, DEFAULT_SERVER_NAME};
pub use registry::{
    CapabilityRegistry, HandlerResult, PromptDefinition, ResourceDefinition, ToolDefinition,
};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::Result;
use crate::protocol::Router;
use crate::server::stats::StatsSnapshot;
use crate::transport::{HttpSseServer, StdioServer, TransportKind};

/// Identity reported by `initialize` and `/health`.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

/// Lifecycle states. `Error` is terminal: a failed server is rebuilt, not
/// restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Running => "running",
            ServerState::Stopping => "stopping",
            ServerState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Observable state holder; transitions are broadcast to watchers.
pub(crate) struct StateCell {
    tx: watch::Sender<ServerState>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(ServerState::Stopped);
        StateCell { tx }
    }

    pub(crate) fn get(&self) -> ServerState {
        *self.tx.borrow()
    }

    pub(crate) fn set(&self, next: ServerState) {
        let prev = self.tx.send_replace(next);
        if prev != next {
            tracing::debug!(from = %prev, to = %next, "server state changed");
        }
    }

    pub(crate) async fn wait_for(&self, target: ServerState) {
        let mut rx = self.tx.subscribe();
        // Err only if the sender is dropped, and the cell owns the sender
        let _ = rx.wait_for(|state| *state == target).await;
    }
}

/// A built MCP server bound to exactly one transport.
pub enum McpServer {
    HttpSse(HttpSseServer),
    Stdio(StdioServer),
}

impl McpServer {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn transport(&self) -> TransportKind {
        match self {
            McpServer::HttpSse(_) => TransportKind::HttpSse,
            McpServer::Stdio(_) => TransportKind::Stdio,
        }
    }

    pub async fn start(&self) -> Result<()> {
        match self {
            McpServer::HttpSse(server) => server.start().await,
            McpServer::Stdio(server) => server.start().await,
        }
    }

    pub async fn stop(&self) -> Result<()> {
        match self {
            McpServer::HttpSse(server) => server.stop().await,
            McpServer::Stdio(server) => server.stop().await,
        }
    }

    pub fn state(&self) -> ServerState {
        match self {
            McpServer::HttpSse(server) => server.state(),
            McpServer::Stdio(server) => server.state(),
        }
    }

    pub fn router(&self) -> &Router {
        match self {
            McpServer::HttpSse(server) => server.router(),
            McpServer::Stdio(server) => server.router(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.router().stats().snapshot()
    }

    /// Push a notification to connected clients: SSE broadcast on HTTP,
    /// an id-less line on stdio.
    pub async fn send_notification(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<()> {
        match self {
            McpServer::HttpSse(server) => server.send_notification(method, params).await,
            McpServer::Stdio(server) => server.send_notification(method, params).await,
        }
    }

    pub async fn wait_stopped(&self) {
        match self {
            McpServer::HttpSse(server) => server.wait_stopped().await,
            McpServer::Stdio(server) => server.wait_stopped().await,
        }
    }

    /// Start and serve until stopped.
    pub async fn run(&self) -> Result<()> {
        self.start().await?;
        self.wait_stopped().await;
        Ok(())
    }
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("transport", &self.transport())
            .field("server", &self.router().identity().name)
            .field("state", &self.state())
            .finish()
    }
}
