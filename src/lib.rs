//! # mcp-host
//!
//! An SDK for building Model Context Protocol (MCP) servers in Rust.
//!
//! Servers are assembled with a fluent [`ServerBuilder`]: register tools,
//! resources, and prompts, pick a transport, then `build()` and `run()`.
//! One JSON-RPC router serves both transports, so a server moves between
//! HTTP and stdio by changing a single builder call.
//!
//! ## Features
//!
//! - **Protocol**: the JSON-RPC 2.0 dialect of MCP 2025-03-26 (initialize,
//!   ping, tools, resources, prompts)
//! - **Transports**: HTTP with Server-Sent Events, or newline-delimited stdio
//! - **Capabilities**: ordered registry with shorthand schema normalization
//! - **Access control**: bearer, API key, basic, or custom authentication
//! - **Extension points**: middleware ahead of dispatch, hooks on lifecycle
//!   and capability events
//! - **Observability**: structured logging and atomic server statistics
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcp_host::{McpServer, TransportKind};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = McpServer::builder()
//!         .name("demo-server")?
//!         .version("0.1.0")?
//!         .transport(TransportKind::HttpSse)
//!         .port(8080)
//!         .tool(
//!             "echo",
//!             "Echo the arguments back",
//!             json!({"text": "string"}),
//!             |args| async move { Ok(args) },
//!         )?
//!         .build()?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod utils;

// Re-export main types for convenience
pub use config::Config;
pub use error::{BuildError, ErrorCode, HandlerError, Result, RpcError, ServerError};
pub use protocol::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
    PROTOCOL_VERSION,
};
pub use server::hooks::{hook_fn, Hook, HookEvent};
pub use server::middleware::{middleware_fn, Middleware, MiddlewareError};
pub use server::{
    HandlerResult, McpServer, ResourceDefinition, ServerBuilder, ServerState, ValidationReport,
};
pub use transport::TransportKind;
pub use utils::auth::{AuthConfig, AuthOutcome, RequestMeta};

/// Version reported for servers that never configure one explicitly.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
