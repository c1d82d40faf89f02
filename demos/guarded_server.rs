//! Extension points example.
//!
//! A middleware rejects one method outright and a hook reports tool
//! activity. The server reads newline-delimited JSON-RPC from stdin, so it
//! can be driven with a pipe:
//!
//! echo '{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"shout","arguments":{"text":"hi"}}}' \
//!     | cargo run --example guarded_server

use mcp_host::{hook_fn, middleware_fn, HookEvent, JsonRpcMessage, McpServer, MiddlewareError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let tool_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&tool_calls);

    let server = McpServer::builder()
        .name("guarded-server")?
        .version("0.2.0")?
        .tool(
            "shout",
            "Uppercase the input",
            json!({"text": "string"}),
            |args| async move {
                let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
                Ok(json!(text.to_uppercase()))
            },
        )?
        .middleware(middleware_fn(|message| {
            if let JsonRpcMessage::Request(request) = message {
                if request.method == "resources/read" {
                    return Err(MiddlewareError::blocked("no resources on this server"));
                }
            }
            Ok(())
        }))
        .hook(hook_fn(move |event| {
            if let HookEvent::ToolCalled { name, .. } = event {
                counter.fetch_add(1, Ordering::Relaxed);
                eprintln!("tool invoked: {}", name);
            }
            Ok(())
        }))
        .build()?;

    // Stops on stdin EOF; counters reset at stop, so the hook keeps its own.
    server.run().await?;

    eprintln!("served {} tool calls", tool_calls.load(Ordering::Relaxed));
    Ok(())
}
