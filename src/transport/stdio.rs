//! Stdio transport.
//!
//! Newline-delimited JSON-RPC over stdin/stdout. Blank lines and `#` or
//! `//` comment lines are skipped. Each line is dispatched on its own
//! task, so responses may be written out of order. EOF on stdin stops the
//! server. Logging goes to stderr; stdout carries only protocol frames.

use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::error::{Result, ServerError};
use crate::protocol::{serialize_response, JsonRpcNotification, Router};
use crate::server::hooks::HookEvent;
use crate::server::{ServerState, StateCell};
use crate::transport::TransportKind;
use crate::utils;
use crate::utils::auth::AuthConfig;

const OUTBOUND_BUFFER: usize = 256;

type SharedSender = Arc<Mutex<Option<mpsc::Sender<String>>>>;

/// MCP server speaking newline-delimited JSON-RPC over stdin/stdout.
pub struct StdioServer {
    router: Router,
    auth: Option<AuthConfig>,
    state: Arc<StateCell>,
    outbound: SharedSender,
    shutdown: Mutex<Option<mpsc::Sender<()>>>,
}

impl StdioServer {
    pub(crate) fn new(router: Router, auth: Option<AuthConfig>) -> Self {
        StdioServer {
            router,
            auth,
            state: Arc::new(StateCell::new()),
            outbound: Arc::new(Mutex::new(None)),
            shutdown: Mutex::new(None),
        }
    }

    /// Spawn the reader and writer tasks. Fails if the server is not
    /// stopped.
    pub async fn start(&self) -> Result<()> {
        let current = self.state.get();
        if current != ServerState::Stopped {
            return Err(ServerError::State(format!(
                "cannot start stdio transport from state '{}'",
                current
            )));
        }
        self.state.set(ServerState::Starting);

        // The gate has no headers to inspect here; warn and accept
        if let Some(auth) = &self.auth {
            warn!(
                scheme = auth.scheme(),
                "authentication cannot be enforced on stdio, accepting all requests"
            );
        }

        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
        *self.outbound.lock().await = Some(out_tx);

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        *self.shutdown.lock().await = Some(shutdown_tx);

        tokio::spawn(write_lines(out_rx));
        tokio::spawn(read_lines(
            self.router.clone(),
            Arc::clone(&self.outbound),
            Arc::clone(&self.state),
            shutdown_rx,
        ));

        self.state.set(ServerState::Running);
        info!("stdio transport reading from stdin");
        self.router
            .hooks()
            .emit(&HookEvent::ServerStarted {
                transport: TransportKind::Stdio,
            })
            .await;
        Ok(())
    }

    /// Signal the reader to exit and wait for teardown. Stopping a stopped
    /// server is a no-op.
    pub async fn stop(&self) -> Result<()> {
        match self.state.get() {
            ServerState::Stopped | ServerState::Stopping | ServerState::Error => return Ok(()),
            _ => {}
        }

        if let Some(sender) = self.shutdown.lock().await.take() {
            if sender.send(()).await.is_err() {
                warn!("stdio reader already exited");
            }
        }
        self.state.wait_for(ServerState::Stopped).await;
        Ok(())
    }

    pub fn state(&self) -> ServerState {
        self.state.get()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Write a server-initiated notification as an id-less line.
    pub async fn send_notification(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<()> {
        let sender = { self.outbound.lock().await.clone() };
        let sender = match sender {
            Some(s) => s,
            None => {
                return Err(ServerError::State(
                    "stdio transport is not running".to_string(),
                ))
            }
        };
        let notification = JsonRpcNotification::new(method, params);
        let line = serde_json::to_string(&notification)?;
        sender
            .send(line)
            .await
            .map_err(|_| ServerError::Transport("stdout writer is gone".to_string()))?;
        Ok(())
    }

    /// Wait until the server reaches the stopped state. Useful for serving
    /// until EOF.
    pub async fn wait_stopped(&self) {
        self.state.wait_for(ServerState::Stopped).await;
    }
}

async fn write_lines(mut receiver: mpsc::Receiver<String>) {
    let mut stdout = tokio::io::stdout();
    while let Some(line) = receiver.recv().await {
        let framed = format!("{}\n", line);
        if let Err(e) = stdout.write_all(framed.as_bytes()).await {
            error!(error = %e, "failed to write to stdout");
            break;
        }
        if let Err(e) = stdout.flush().await {
            error!(error = %e, "failed to flush stdout");
            break;
        }
    }
    debug!("stdout writer stopped");
}

async fn read_lines(
    router: Router,
    outbound: SharedSender,
    state: Arc<StateCell>,
    mut shutdown: mpsc::Receiver<()>,
) {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let sender = match outbound.lock().await.clone() {
        Some(s) => s,
        None => return,
    };

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                info!("stdio transport received shutdown signal");
                break;
            }
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let router = router.clone();
                        let sender = sender.clone();
                        tokio::spawn(async move {
                            if let Some(reply) = process_line(&router, &line).await {
                                if sender.send(reply).await.is_err() {
                                    warn!("stdout writer gone, dropping response");
                                }
                            }
                        });
                    }
                    Ok(None) => {
                        info!("EOF on stdin");
                        break;
                    }
                    Err(e) => {
                        error!(error = %e, "error reading stdin");
                        break;
                    }
                }
            }
        }
    }

    drop(sender);
    finalize(&router, &outbound, &state).await;
}

/// Shared teardown for shutdown signal and EOF.
async fn finalize(router: &Router, outbound: &SharedSender, state: &StateCell) {
    if state.get() == ServerState::Stopped {
        return;
    }
    state.set(ServerState::Stopping);
    *outbound.lock().await = None;
    router.stats().reset();
    router.hooks().emit(&HookEvent::ServerStopped).await;
    state.set(ServerState::Stopped);
    info!("stdio transport stopped");
}

/// Handle one stdin line. Blank lines, comments, and notifications yield
/// no reply.
async fn process_line(router: &Router, line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
        return None;
    }
    debug!(line = %utils::truncate_string(trimmed, 200), "stdin line");

    let response = router.process_text(trimmed).await?;
    match serialize_response(&response) {
        Ok(json) => Some(json),
        Err(e) => {
            error!(error = %e.message, "failed to serialize response");
            None
        }
    }
}
