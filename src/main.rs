//! Reference MCP server binary.
//!
//! Wires a TOML configuration onto the builder, registers a small set of
//! demonstration capabilities, and serves over HTTP+SSE or stdio.

use anyhow::Context;
use clap::{Parser, Subcommand};
use handlebars::Handlebars;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use mcp_host::config::{Config, LogFormat, LoggingConfig};
use mcp_host::protocol::PromptArgument;
use mcp_host::utils::logging::init_logging;
use mcp_host::{
    HandlerError, McpServer, ResourceDefinition, ServerBuilder, TransportKind, PROTOCOL_VERSION,
};

const GREETING_TEMPLATE: &str = "{{#if formal}}Good day, {{name}}. Welcome to {{server}}.\
{{else}}Hello, {{name}}! Welcome to {{server}}.{{/if}}";

/// MCP host CLI
#[derive(Parser)]
#[command(name = "mcp-host")]
#[command(about = "A Model Context Protocol (MCP) server over HTTP+SSE or stdio")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level override
    #[arg(long)]
    log_level: Option<String>,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Server name override
        #[arg(long)]
        name: Option<String>,

        /// Server version override
        #[arg(long)]
        version: Option<String>,

        /// Transport override ("http-sse" or "stdio")
        #[arg(long)]
        transport: Option<TransportKind>,

        /// HTTP bind address override
        #[arg(long)]
        bind: Option<String>,

        /// HTTP port override
        #[arg(long)]
        port: Option<u16>,
    },

    /// Generate a default configuration file
    Config {
        /// Output file path
        #[arg(short, long, default_value = "mcp-host.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Show server information
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve {
            name,
            version,
            transport,
            bind,
            port,
        }) => {
            serve(
                cli.config,
                name,
                version,
                transport,
                bind,
                port,
                cli.verbose,
                cli.log_level,
            )
            .await
        }
        None => {
            serve(
                cli.config, None, None, None, None, None, cli.verbose, cli.log_level,
            )
            .await
        }
        Some(Commands::Config { output, force }) => {
            init_logging(&cli_logging(cli.verbose, cli.log_level))?;
            generate_config(output, force)
        }
        Some(Commands::Validate { file }) => {
            init_logging(&cli_logging(cli.verbose, cli.log_level))?;
            validate_config(file)
        }
        Some(Commands::Info) => {
            init_logging(&cli_logging(cli.verbose, cli.log_level))?;
            show_info();
            Ok(())
        }
    }
}

/// Logging setup for the non-serving subcommands.
fn cli_logging(verbose: bool, log_level: Option<String>) -> LoggingConfig {
    let level = if verbose {
        "debug".to_string()
    } else {
        log_level.unwrap_or_else(|| "info".to_string())
    };
    LoggingConfig {
        level,
        format: LogFormat::Compact,
        stderr: false,
    }
}

/// Load configuration, apply CLI overrides, and serve until stopped.
#[allow(clippy::too_many_arguments)]
async fn serve(
    config_path: Option<PathBuf>,
    name: Option<String>,
    version: Option<String>,
    transport: Option<TransportKind>,
    bind: Option<String>,
    port: Option<u16>,
    verbose: bool,
    log_level: Option<String>,
) -> anyhow::Result<()> {
    let mut config = match &config_path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Cannot load {}", path.display()))?,
        None => Config::from_env().context("Cannot load configuration")?,
    };

    if let Some(name) = name {
        config.server.name = name;
    }
    if let Some(version) = version {
        config.server.version = version;
    }
    if let Some(transport) = transport {
        config.transport.kind = transport;
    }
    if let Some(bind) = bind {
        config.transport.bind_address = bind;
    }
    if let Some(port) = port {
        config.transport.port = port;
    }

    if verbose {
        config.logging.level = "debug".to_string();
    } else if let Some(level) = log_level {
        config.logging.level = level;
    }
    // stdout carries protocol frames on stdio
    if config.transport.kind == TransportKind::Stdio {
        config.logging.stderr = true;
    }

    init_logging(&config.logging)?;

    if let Some(path) = &config_path {
        info!("Loaded configuration from {}", path.display());
    }
    config.validate().context("Invalid configuration")?;

    let server = build_server(&config)?;

    info!("Server configuration:");
    info!("  Name: {}", config.server.name);
    info!("  Version: {}", config.server.version);
    info!("  Transport: {}", config.transport.kind);
    if config.transport.kind == TransportKind::HttpSse {
        info!(
            "  Address: {}:{}",
            config.transport.bind_address, config.transport.port
        );
    }

    server.start().await?;

    tokio::select! {
        _ = server.wait_stopped() => {}
        result = wait_for_signal() => {
            result?;
            server.stop().await?;
        }
    }

    info!("Server stopped");
    Ok(())
}

/// Resolve on SIGTERM or SIGINT.
async fn wait_for_signal() -> anyhow::Result<()> {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to install SIGTERM handler")?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
        .context("Failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down gracefully");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down gracefully");
        }
    }

    Ok(())
}

/// Assemble the reference server: echo and calculator tools, a server-info
/// resource, and a templated greeting prompt.
fn build_server(config: &Config) -> anyhow::Result<McpServer> {
    let mut builder = McpServer::builder()
        .name(&config.server.name)?
        .version(&config.server.version)?
        .transport(config.transport.kind)
        .bind_address(&config.transport.bind_address)
        .port(config.transport.port);

    if let Some(description) = &config.server.description {
        builder = builder.description(description);
    }
    if let Some(auth) = config.auth.to_auth()? {
        builder = builder.auth(auth);
    }

    let builder = register_tools(builder)?;
    let builder = register_resources(builder, config)?;
    let builder = register_prompts(builder, config)?;

    Ok(builder.build()?)
}

fn register_tools(builder: ServerBuilder) -> anyhow::Result<ServerBuilder> {
    let builder = builder
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
                    .ok_or_else(|| HandlerError::new("Parameter 'message' is required"))?;
                Ok(json!(format!("Echo: {}", message)))
            },
        )?
        .tool(
            "calculator",
            "Perform basic arithmetic on two numbers",
            json!({
                "operation": {
                    "type": "string",
                    "description": "Mathematical operation to perform",
                    "enum": ["add", "subtract", "multiply", "divide"],
                    "required": true,
                },
                "a": {"type": "number", "description": "First operand", "required": true},
                "b": {"type": "number", "description": "Second operand", "required": true},
            }),
            |args| async move {
                let operation = args
                    .get("operation")
                    .and_then(Value::as_str)
                    .ok_or_else(|| HandlerError::new("Operation is required"))?;
                let a = args.get("a").and_then(Value::as_f64).ok_or_else(|| {
                    HandlerError::new("Parameter 'a' is required and must be a number")
                })?;
                let b = args.get("b").and_then(Value::as_f64).ok_or_else(|| {
                    HandlerError::new("Parameter 'b' is required and must be a number")
                })?;

                let result = match operation {
                    "add" => a + b,
                    "subtract" => a - b,
                    "multiply" => a * b,
                    "divide" => {
                        if b == 0.0 {
                            return Err(HandlerError::new("Division by zero"));
                        }
                        a / b
                    }
                    other => {
                        return Err(HandlerError::new(format!("Unknown operation: {}", other)));
                    }
                };

                Ok(json!(format!("{} {} {} = {}", a, operation, b, result)))
            },
        )?;

    Ok(builder)
}

fn register_resources(builder: ServerBuilder, config: &Config) -> anyhow::Result<ServerBuilder> {
    let name = config.server.name.clone();
    let version = config.server.version.clone();
    let transport = config.transport.kind;

    let definition = ResourceDefinition::new(
        "info://server",
        "Server name, version, and protocol information",
        move || {
            let name = name.clone();
            let version = version.clone();
            async move {
                Ok(json!({
                    "name": name,
                    "version": version,
                    "protocolVersion": PROTOCOL_VERSION,
                    "transport": transport,
                }))
            }
        },
    )
    .with_name("server-info");

    Ok(builder.resource_definition(definition)?)
}

fn register_prompts(builder: ServerBuilder, config: &Config) -> anyhow::Result<ServerBuilder> {
    let mut handlebars = Handlebars::new();
    handlebars
        .register_template_string("greeting", GREETING_TEMPLATE)
        .context("Failed to register greeting template")?;
    let handlebars = Arc::new(handlebars);

    let server_name = config.server.name.clone();
    let builder = builder.prompt(
        "greeting",
        "Render a personalized greeting",
        vec![
            PromptArgument::required("name", "Who to greet"),
            PromptArgument::optional("formal", "Use a formal greeting"),
        ],
        move |args| {
            let handlebars = Arc::clone(&handlebars);
            let server_name = server_name.clone();
            async move {
                let mut data = args;
                if let Some(object) = data.as_object_mut() {
                    object.insert("server".to_string(), json!(server_name));
                }
                let text = handlebars
                    .render("greeting", &data)
                    .map_err(|e| HandlerError::new(format!("Failed to render template: {}", e)))?;

                Ok(json!({
                    "messages": [{
                        "role": "user",
                        "content": {"type": "text", "text": text},
                    }],
                }))
            }
        },
    )?;

    Ok(builder)
}

/// Generate a default configuration file
fn generate_config(output: PathBuf, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        error!("Configuration file already exists: {}", output.display());
        error!("Use --force to overwrite");
        std::process::exit(1);
    }

    let config = Config::default();
    config.to_file(&output)?;

    info!("Generated configuration file: {}", output.display());
    Ok(())
}

/// Validate a configuration file
fn validate_config(file: PathBuf) -> anyhow::Result<()> {
    info!("Validating configuration file: {}", file.display());

    let config = Config::from_file(&file)?;
    config.validate()?;

    info!("Configuration file is valid");
    Ok(())
}

/// Show server information
fn show_info() {
    info!("mcp-host");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Protocol Version: {}", PROTOCOL_VERSION);
    info!("Description: {}", env!("CARGO_PKG_DESCRIPTION"));
    info!("--------------------------------");
    info!("Features:");
    info!("  - HTTP transport with Server-Sent Events (SSE)");
    info!("  - STDIO transport for subprocess embedding");
    info!("  - Tools, resources, and prompts with schema normalization");
    info!("  - Bearer, API key, and basic authentication");
    info!("  - Middleware and lifecycle hooks");
    info!("  - TOML configuration with environment overrides");
    info!("--------------------------------");
    info!("Repository: {}", env!("CARGO_PKG_REPOSITORY"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::try_parse_from(["mcp-host", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.command.is_none());

        let cli = Cli::try_parse_from([
            "mcp-host",
            "serve",
            "--name",
            "test-server",
            "--transport",
            "stdio",
            "--port",
            "9090",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Serve {
                name,
                transport,
                port,
                ..
            }) => {
                assert_eq!(name, Some("test-server".to_string()));
                assert_eq!(transport, Some(TransportKind::Stdio));
                assert_eq!(port, Some(9090));
            }
            _ => panic!("Expected serve command"),
        }
    }

    #[test]
    fn test_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test-config.toml");

        assert!(generate_config(config_path.clone(), false).is_ok());
        assert!(config_path.exists());

        assert!(validate_config(config_path).is_ok());
    }

    #[test]
    fn test_reference_server_builds() {
        let mut config = Config::default();
        config.transport.kind = TransportKind::Stdio;

        let server = build_server(&config).unwrap();
        let registry = server.router().registry();
        assert_eq!(registry.tool_count(), 2);
        assert_eq!(registry.resource_count(), 1);
        assert_eq!(registry.prompt_count(), 1);
        assert!(registry.tool("calculator").is_some());
        assert!(registry.resource("info://server").is_some());
    }

    #[tokio::test]
    async fn test_calculator_division_by_zero_is_soft_error() {
        let mut config = Config::default();
        config.transport.kind = TransportKind::Stdio;
        let server = build_server(&config).unwrap();

        let request = r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"calculator","arguments":{"operation":"divide","a":1,"b":0}}}"#;
        let response = server.router().process_text(request).await.unwrap();

        let result = response.result.unwrap();
        assert_eq!(result["isError"], json!(true));
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Division by zero"), "got: {}", text);
    }

    #[tokio::test]
    async fn test_greeting_prompt_renders_template() {
        let mut config = Config::default();
        config.transport.kind = TransportKind::Stdio;
        let server = build_server(&config).unwrap();

        let request = r#"{"jsonrpc":"2.0","id":2,"method":"prompts/get","params":{"name":"greeting","arguments":{"name":"Ada"}}}"#;
        let response = server.router().process_text(request).await.unwrap();

        let result = response.result.unwrap();
        let text = result["messages"][0]["content"]["text"].as_str().unwrap();
        assert!(text.starts_with("Hello, Ada!"), "got: {}", text);
    }
}
