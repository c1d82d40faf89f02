//! SSE client registry and broadcast fan-out.
//!
//! Each connected client owns a bounded frame channel and a heartbeat
//! timer. Removal aborts the timer and drops the sender, which ends the
//! client's HTTP stream.

use actix_web::web::Bytes;
use chrono::{DateTime, Utc};
use futures_util::Stream;
use serde_json::json;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, warn};

use crate::server::stats::ServerStats;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const FRAME_BUFFER: usize = 64;

/// One connected SSE client.
pub struct SseClient {
    pub id: String,
    pub connected_at: DateTime<Utc>,
    sender: mpsc::Sender<Bytes>,
    heartbeat: tokio::task::JoinHandle<()>,
}

/// Shared map of connected SSE clients.
#[derive(Clone)]
pub struct SseClientMap {
    clients: Arc<RwLock<HashMap<String, SseClient>>>,
    stats: Arc<ServerStats>,
}

impl SseClientMap {
    pub fn new(stats: Arc<ServerStats>) -> Self {
        SseClientMap {
            clients: Arc::new(RwLock::new(HashMap::new())),
            stats,
        }
    }

    /// Register a client and return its event stream. The stream starts
    /// with a `connected` event and receives `: heartbeat` comments every
    /// 30 seconds until the client is removed.
    pub async fn register(&self, client_id: String) -> ClientStream {
        let (sender, receiver) = mpsc::channel(FRAME_BUFFER);

        let hello = json!({ "type": "connected", "clientId": client_id });
        // Fresh channel, the first frame always fits
        let _ = sender.try_send(Bytes::from(format!("data: {}\n\n", hello)));

        let heartbeat_sender = sender.clone();
        let heartbeat = tokio::spawn(async move {
            let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                if heartbeat_sender
                    .send(Bytes::from_static(b": heartbeat\n\n"))
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        let client = SseClient {
            id: client_id.clone(),
            connected_at: Utc::now(),
            sender,
            heartbeat,
        };
        self.clients.write().await.insert(client_id.clone(), client);
        self.stats.sse_connected();
        debug!(client_id = %client_id, "SSE client connected");

        ClientStream {
            client_id,
            map: self.clone(),
            receiver,
        }
    }

    /// Remove a client, cancelling its heartbeat.
    pub async fn remove(&self, client_id: &str) {
        if let Some(client) = self.clients.write().await.remove(client_id) {
            client.heartbeat.abort();
            self.stats.sse_disconnected();
            debug!(client_id = %client.id, "SSE client disconnected");
        }
    }

    /// Send one JSON payload to every connected client. Clients whose
    /// receiver is gone are pruned.
    pub async fn broadcast(&self, payload: &str) {
        let frame = Bytes::from(format!("data: {}\n\n", payload));
        let mut dead = Vec::new();
        {
            let clients = self.clients.read().await;
            for (id, client) in clients.iter() {
                match client.sender.try_send(frame.clone()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        warn!(client_id = %id, "SSE buffer full, dropping frame");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        dead.push(id.clone());
                    }
                }
            }
        }
        for id in dead {
            self.remove(&id).await;
        }
    }

    /// Remove every client, ending all streams.
    pub async fn clear(&self) {
        let mut clients = self.clients.write().await;
        for (_, client) in clients.drain() {
            client.heartbeat.abort();
            self.stats.sse_disconnected();
        }
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    pub async fn client_ids(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }
}

/// Frame stream handed to actix's `streaming` body. Dropping it (client
/// disconnect) removes the client from the map.
pub struct ClientStream {
    client_id: String,
    map: SseClientMap,
    receiver: mpsc::Receiver<Bytes>,
}

impl Stream for ClientStream {
    type Item = Result<Bytes, actix_web::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Drop for ClientStream {
    fn drop(&mut self) {
        let map = self.map.clone();
        let client_id = self.client_id.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { map.remove(&client_id).await });
        }
    }
}
