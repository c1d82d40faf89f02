//! Fluent server builder.
//!
//! Registration problems (bad names, duplicate capabilities, unknown
//! schema types) fail at the call site; configuration problems surface
//! through [`ValidationReport`] and abort `build()`.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::error::BuildError;
use crate::protocol::messages::PromptArgument;
use crate::protocol::Router;
use crate::server::hooks::{Hook, HookDispatcher};
use crate::server::middleware::{Middleware, MiddlewareChain};
use crate::server::registry::{
    CapabilityRegistry, HandlerResult, PromptDefinition, ResourceDefinition, ToolDefinition,
};
use crate::server::schema;
use crate::server::stats::ServerStats;
use crate::server::{McpServer, ServerIdentity};
use crate::transport::{HttpSseServer, StdioServer, TransportKind};
use crate::utils::auth::AuthConfig;
use crate::utils::validation::{validate_server_name, validate_version};

/// Name used when the caller never sets one. Building with it works but
/// draws a validation warning.
pub const DEFAULT_SERVER_NAME: &str = "mcp-server";

/// Bind address used when the caller never sets one.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Outcome of pre-build validation. Errors abort `build()`; warnings are
/// logged and building proceeds.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Collects everything a server needs before it can start.
pub struct ServerBuilder {
    name: String,
    version: Option<String>,
    description: Option<String>,
    transport: TransportKind,
    bind_address: String,
    port: Option<u16>,
    auth: Option<AuthConfig>,
    registry: CapabilityRegistry,
    middleware: Vec<Arc<dyn Middleware>>,
    hooks: Vec<Arc<dyn Hook>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        ServerBuilder {
            name: DEFAULT_SERVER_NAME.to_string(),
            version: None,
            description: None,
            transport: TransportKind::Stdio,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: None,
            auth: None,
            registry: CapabilityRegistry::new(),
            middleware: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Set the server name: 1 to 128 characters from `[A-Za-z0-9_-]`.
    pub fn name(mut self, name: impl Into<String>) -> Result<Self, BuildError> {
        let name = name.into();
        validate_server_name(&name)?;
        self.name = name;
        Ok(self)
    }

    /// Set the server version. Accepts `major.minor` or
    /// `major.minor.patch`, optionally with pre-release and build tags.
    pub fn version(mut self, version: impl Into<String>) -> Result<Self, BuildError> {
        let version = version.into();
        validate_version(&version)?;
        self.version = Some(version);
        Ok(self)
    }

    /// Free-form description, surfaced as `instructions` in the
    /// initialize result.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Register a tool. The schema may be shorthand, simplified, or
    /// canonical JSON Schema; it is normalized here, so schema problems
    /// fail at registration naming the tool and parameter.
    pub fn tool<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        schema: Value,
        handler: F,
    ) -> Result<Self, BuildError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let name = name.into();
        let input_schema = schema::normalize_schema(&name, &schema)?;
        self.registry
            .register_tool(ToolDefinition::new(name, description, input_schema, handler))?;
        Ok(self)
    }

    /// Register a resource keyed by URI.
    pub fn resource<F, Fut>(
        mut self,
        uri: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Result<Self, BuildError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry
            .register_resource(ResourceDefinition::new(uri, description, handler))?;
        Ok(self)
    }

    /// Register a resource built elsewhere, for custom name or mime type.
    pub fn resource_definition(
        mut self,
        definition: ResourceDefinition,
    ) -> Result<Self, BuildError> {
        self.registry.register_resource(definition)?;
        Ok(self)
    }

    /// Register a prompt template.
    pub fn prompt<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: Vec<PromptArgument>,
        handler: F,
    ) -> Result<Self, BuildError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry
            .register_prompt(PromptDefinition::new(name, description, arguments, handler))?;
        Ok(self)
    }

    /// Append a middleware; the chain runs in registration order and the
    /// first rejection wins.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Subscribe a hook to lifecycle and capability events.
    pub fn hook(mut self, hook: impl Hook + 'static) -> Self {
        self.hooks.push(Arc::new(hook));
        self
    }

    /// Check the configuration without consuming the builder.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();

        if self.version.is_none() {
            report.errors.push("server version is required".to_string());
        }
        if self.transport == TransportKind::HttpSse && self.port.is_none() {
            report
                .errors
                .push("HTTP transport requires a port".to_string());
        }

        if self.name == DEFAULT_SERVER_NAME {
            report.warnings.push(format!(
                "server name is the default '{}'",
                DEFAULT_SERVER_NAME
            ));
        }
        if self.registry.is_empty() {
            report
                .warnings
                .push("no tools, resources, or prompts registered".to_string());
        }
        if self.auth.is_some() && self.transport == TransportKind::Stdio {
            report
                .warnings
                .push("authentication is configured but cannot be enforced on stdio".to_string());
        }

        report
    }

    /// Validate and assemble the server. Warnings are logged; errors
    /// abort the build.
    pub fn build(self) -> Result<McpServer, BuildError> {
        let report = self.validate();
        for warning in &report.warnings {
            warn!(warning = %warning, "server configuration");
        }
        if !report.is_ok() {
            return Err(BuildError::Validation(report.errors));
        }

        let version = self.version.ok_or_else(|| {
            BuildError::Validation(vec!["server version is required".to_string()])
        })?;
        let identity = ServerIdentity {
            name: self.name,
            version,
            description: self.description,
        };
        let router = Router::new(
            identity,
            Arc::new(self.registry),
            MiddlewareChain::new(self.middleware),
            HookDispatcher::new(self.hooks),
            Arc::new(ServerStats::new()),
        );

        match self.transport {
            TransportKind::HttpSse => {
                let port = self.port.ok_or_else(|| {
                    BuildError::Validation(vec!["HTTP transport requires a port".to_string()])
                })?;
                Ok(McpServer::HttpSse(HttpSseServer::new(
                    router,
                    self.auth,
                    self.bind_address,
                    port,
                )))
            }
            TransportKind::Stdio => Ok(McpServer::Stdio(StdioServer::new(router, self.auth))),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("description", &self.description)
            .field("transport", &self.transport)
            .field("bind_address", &self.bind_address)
            .field("port", &self.port)
            .field("auth", &self.auth)
            .field("registry", &self.registry)
            .field("middleware", &self.middleware.len())
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> ServerBuilder {
        ServerBuilder::new()
            .name("unit-server")
            .and_then(|b| b.version("1.0.0"))
            .unwrap()
    }

    #[test]
    fn test_build_defaults_to_stdio() {
        let server = minimal().build().unwrap();
        assert_eq!(server.transport(), TransportKind::Stdio);
        assert_eq!(server.router().identity().name, "unit-server");
        assert_eq!(server.state(), crate::server::ServerState::Stopped);
    }

    #[test]
    fn test_http_transport_requires_port() {
        let err = minimal()
            .transport(TransportKind::HttpSse)
            .build()
            .unwrap_err();
        match err {
            BuildError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("port")));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let server = minimal()
            .transport(TransportKind::HttpSse)
            .port(8080)
            .build()
            .unwrap();
        assert_eq!(server.transport(), TransportKind::HttpSse);
    }

    #[test]
    fn test_missing_version_is_fatal() {
        let err = ServerBuilder::new()
            .name("unit-server")
            .unwrap()
            .build()
            .unwrap_err();
        match err {
            BuildError::Validation(errors) => {
                assert!(errors.iter().any(|e| e.contains("version")));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_name_rules() {
        assert!(ServerBuilder::new().name("ok_name-1").is_ok());
        assert!(ServerBuilder::new().name("a".repeat(128)).is_ok());
        assert!(ServerBuilder::new().name("a".repeat(129)).is_err());
        assert!(ServerBuilder::new().name("spaces not allowed").is_err());
        assert!(ServerBuilder::new().name("").is_err());
    }

    #[test]
    fn test_version_rules() {
        assert!(ServerBuilder::new().version("1.0").is_ok());
        assert!(ServerBuilder::new().version("1.2.3-alpha.1+build5").is_ok());
        assert!(ServerBuilder::new().version("v1.0").is_err());
        assert!(ServerBuilder::new().version("1").is_err());
    }

    #[test]
    fn test_duplicate_tool_fails_at_registration() {
        let builder = minimal()
            .tool("echo", "Echo", json!({}), |args| async move { Ok(args) })
            .unwrap();
        let err = builder
            .tool("echo", "Echo again", json!({}), |args| async move { Ok(args) })
            .unwrap_err();
        assert!(matches!(err, BuildError::DuplicateTool { .. }));
    }

    #[test]
    fn test_unknown_schema_type_names_tool_and_parameter() {
        let err = minimal()
            .tool(
                "lookup",
                "Lookup",
                json!({"q": "strnig"}),
                |args| async move { Ok(args) },
            )
            .unwrap_err();
        match err {
            BuildError::UnknownSchemaType {
                tool,
                parameter,
                ty,
            } => {
                assert_eq!(tool, "lookup");
                assert_eq!(parameter, "q");
                assert_eq!(ty, "strnig");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_shorthand_schema_is_normalized() {
        let server = minimal()
            .tool(
                "search",
                "Search",
                json!({"q": "string"}),
                |args| async move { Ok(args) },
            )
            .unwrap()
            .build()
            .unwrap();

        let tool = server.router().registry().tool("search").unwrap();
        assert_eq!(
            tool.input_schema,
            json!({
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": [],
            })
        );
    }

    #[test]
    fn test_validation_report_warnings() {
        let report = ServerBuilder::new().validate();
        assert!(!report.is_ok());
        assert!(report.errors.iter().any(|e| e.contains("version")));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains(DEFAULT_SERVER_NAME)));
        assert!(report.warnings.iter().any(|w| w.contains("registered")));

        let report = minimal()
            .auth(AuthConfig::bearer("token"))
            .validate();
        assert!(report.is_ok());
        assert!(report.warnings.iter().any(|w| w.contains("stdio")));
    }

    #[test]
    fn test_registered_capabilities_surface_in_registry() {
        let server = minimal()
            .tool("echo", "Echo", json!({}), |args| async move { Ok(args) })
            .unwrap()
            .resource("status://uptime", "Uptime", || async { Ok(json!(1)) })
            .unwrap()
            .prompt(
                "greeting",
                "Greet",
                vec![PromptArgument::required("name", "Name")],
                |args| async move { Ok(json!({"messages": [], "got": args})) },
            )
            .unwrap()
            .build()
            .unwrap();

        let registry = server.router().registry();
        assert_eq!(registry.tool_count(), 1);
        assert_eq!(registry.resource_count(), 1);
        assert_eq!(registry.prompt_count(), 1);
    }
}
