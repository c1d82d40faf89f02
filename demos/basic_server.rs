//! Basic MCP server example.
//!
//! Builds an HTTP+SSE server with two tools and an uptime resource, then
//! serves until interrupted.
//!
//! Run with: cargo run --example basic_server

use mcp_host::{McpServer, TransportKind};
use serde_json::{json, Value};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_target(false).init();

    let started = Instant::now();

    let server = McpServer::builder()
        .name("basic-server")?
        .version("1.0.0")?
        .description("A basic MCP server with an echo tool and an uptime resource")
        .transport(TransportKind::HttpSse)
        .port(8080)
        .tool(
            "echo",
            "Echo back the provided message",
            json!({
                "message": {
                    "type": "string",
                    "description": "The message to echo back",
                    "required": true,
                },
            }),
            |args| async move {
                let message = args
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                Ok(json!(format!("Echo: {}", message)))
            },
        )?
        .tool(
            "reverse",
            "Reverse a string",
            json!({"text": "string"}),
            |args| async move {
                let text = args.get("text").and_then(Value::as_str).unwrap_or_default();
                Ok(json!(text.chars().rev().collect::<String>()))
            },
        )?
        .resource(
            "status://uptime",
            "Seconds this server has been up",
            move || async move { Ok(json!(started.elapsed().as_secs())) },
        )?
        .build()?;

    println!("Serving on http://127.0.0.1:8080 (events at /sse, requests at /rpc)");
    println!(
        "Try: curl -X POST http://127.0.0.1:8080/rpc -d '{{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/list\"}}'"
    );
    println!("Press Ctrl+C to stop");

    server.run().await?;
    Ok(())
}
