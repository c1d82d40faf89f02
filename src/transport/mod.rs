//! Transport layer.
//!
//! Two transports carry the protocol: HTTP with Server-Sent Events for
//! networked clients, and newline-delimited stdio for subprocess embedding.
//! Both feed the same [`Router`](crate::protocol::Router).

pub mod http;
pub mod sse;
pub mod stdio;

pub use http::HttpSseServer;
pub use sse::{SseClient, SseClientMap};
pub use stdio::StdioServer;

use serde::{Deserialize, Serialize};

/// Which transport a server was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    #[serde(alias = "http", alias = "sse")]
    HttpSse,
    Stdio,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::HttpSse => "http-sse",
            TransportKind::Stdio => "stdio",
        }
    }
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http-sse" | "http" | "sse" => Ok(TransportKind::HttpSse),
            "stdio" => Ok(TransportKind::Stdio),
            other => Err(format!(
                "Unknown transport '{}', expected 'http-sse' or 'stdio'",
                other
            )),
        }
    }
}
