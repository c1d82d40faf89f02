//! Capability registry: the tools, resources, and prompts a server exposes.
//!
//! The registry is append-only. The builder fills it, `build()` freezes it
//! behind an `Arc`, and the router only ever reads it, so no locking is
//! involved after startup. Definitions keep their registration order; list
//! responses reflect that order.

use crate::error::{BuildError, HandlerError};
use crate::protocol::messages::{Prompt, PromptArgument, Resource, Tool};
use crate::utils::validation::validate_capability_name;
use futures::future::BoxFuture;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// What a capability handler produces: a JSON value or a tagged failure.
pub type HandlerResult = Result<Value, HandlerError>;

/// Async tool handler: arguments in, value out.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Async resource handler: no input, document out.
pub type ResourceHandler = Arc<dyn Fn() -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Async prompt handler: arguments in, `{ "messages": [..] }` out.
pub type PromptHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// A registered tool: canonical input schema plus its handler.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    pub handler: ToolHandler,
}

impl ToolDefinition {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        ToolDefinition {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Wire form for `tools/list`.
    pub fn descriptor(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

/// A registered resource, keyed by its free-form URI.
#[derive(Clone)]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
    pub handler: ResourceHandler,
}

impl ResourceDefinition {
    /// Name defaults to the URI, mime type to `application/json`.
    pub fn new<F, Fut>(
        uri: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        let uri = uri.into();
        ResourceDefinition {
            name: uri.clone(),
            uri,
            description: description.into(),
            mime_type: "application/json".to_string(),
            handler: Arc::new(move || Box::pin(handler())),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    /// Wire form for `resources/list`.
    pub fn descriptor(&self) -> Resource {
        Resource {
            uri: self.uri.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mime_type: self.mime_type.clone(),
        }
    }
}

impl fmt::Debug for ResourceDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDefinition")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// A registered prompt.
#[derive(Clone)]
pub struct PromptDefinition {
    pub name: String,
    pub description: String,
    pub arguments: Vec<PromptArgument>,
    pub handler: PromptHandler,
}

impl PromptDefinition {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        arguments: Vec<PromptArgument>,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
    {
        PromptDefinition {
            name: name.into(),
            description: description.into(),
            arguments,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Wire form for `prompts/list`.
    pub fn descriptor(&self) -> Prompt {
        Prompt {
            name: self.name.clone(),
            description: self.description.clone(),
            arguments: self.arguments.clone(),
        }
    }
}

impl fmt::Debug for PromptDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptDefinition")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Ordered, duplicate-free collections of capability definitions.
#[derive(Debug, Default, Clone)]
pub struct CapabilityRegistry {
    tools: Vec<ToolDefinition>,
    resources: Vec<ResourceDefinition>,
    prompts: Vec<PromptDefinition>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Fails on an invalid name, empty description, or a
    /// name collision.
    pub fn register_tool(&mut self, definition: ToolDefinition) -> Result<(), BuildError> {
        validate_capability_name("tool", &definition.name)?;
        if definition.description.trim().is_empty() {
            return Err(BuildError::EmptyDescription {
                kind: "tool",
                name: definition.name,
            });
        }
        if self.tool(&definition.name).is_some() {
            return Err(BuildError::DuplicateTool(definition.name));
        }
        self.tools.push(definition);
        Ok(())
    }

    /// Register a resource, keyed by URI.
    pub fn register_resource(&mut self, definition: ResourceDefinition) -> Result<(), BuildError> {
        if definition.uri.trim().is_empty() {
            return Err(BuildError::EmptyResourceUri);
        }
        if definition.description.trim().is_empty() {
            return Err(BuildError::EmptyDescription {
                kind: "resource",
                name: definition.uri,
            });
        }
        if self.resource(&definition.uri).is_some() {
            return Err(BuildError::DuplicateResource(definition.uri));
        }
        self.resources.push(definition);
        Ok(())
    }

    /// Register a prompt.
    pub fn register_prompt(&mut self, definition: PromptDefinition) -> Result<(), BuildError> {
        validate_capability_name("prompt", &definition.name)?;
        if definition.description.trim().is_empty() {
            return Err(BuildError::EmptyDescription {
                kind: "prompt",
                name: definition.name,
            });
        }
        if self.prompt(&definition.name).is_some() {
            return Err(BuildError::DuplicatePrompt(definition.name));
        }
        self.prompts.push(definition);
        Ok(())
    }

    pub fn tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDefinition> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDefinition> {
        self.prompts.iter().find(|p| p.name == name)
    }

    /// Tools in registration order.
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn resources(&self) -> &[ResourceDefinition] {
        &self.resources
    }

    pub fn prompts(&self) -> &[PromptDefinition] {
        &self.prompts
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty() && self.resources.is_empty() && self.prompts.is_empty()
    }
}
