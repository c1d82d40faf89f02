//! Method routing shared by both transports.
//!
//! The router owns the full request pipeline after transport concerns:
//! middleware, the method table, statistics, and hook emission. A request
//! always produces exactly one response (result or error); a notification
//! never produces one.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ErrorCode, RpcError};
use crate::protocol::messages::{
    GetPromptResult, Implementation, InitializeParams, InitializeResult, ListPromptsResult,
    ListResourcesResult, ListToolsResult, PromptsCapability, ReadResourceResult, ResourceContents,
    ResourcesCapability, ServerCapabilities, ToolCallResult, ToolsCapability,
};
use crate::protocol::{
    parse_message, validation, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, PROTOCOL_VERSION,
};
use crate::server::hooks::{HookDispatcher, HookEvent};
use crate::server::middleware::MiddlewareChain;
use crate::server::registry::CapabilityRegistry;
use crate::server::stats::ServerStats;
use crate::server::ServerIdentity;
use crate::utils;

/// Routes parsed messages to capability handlers.
#[derive(Clone)]
pub struct Router {
    identity: ServerIdentity,
    registry: Arc<CapabilityRegistry>,
    middleware: MiddlewareChain,
    hooks: HookDispatcher,
    stats: Arc<ServerStats>,
}

impl Router {
    pub fn new(
        identity: ServerIdentity,
        registry: Arc<CapabilityRegistry>,
        middleware: MiddlewareChain,
        hooks: HookDispatcher,
        stats: Arc<ServerStats>,
    ) -> Self {
        Router {
            identity,
            registry,
            middleware,
            hooks,
            stats,
        }
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    pub fn hooks(&self) -> &HookDispatcher {
        &self.hooks
    }

    /// Process one raw payload. Unparsable input yields a PARSE_ERROR
    /// response with a null id.
    pub async fn process_text(&self, raw: &str) -> Option<JsonRpcResponse> {
        match parse_message(raw) {
            Ok(message) => self.process_message(message).await,
            Err(error) => {
                self.stats.record_request();
                Some(self.fail(Value::Null, error).await)
            }
        }
    }

    /// Run middleware, then route. Returns `None` for notifications,
    /// inbound responses, and blocked notifications.
    pub async fn process_message(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        if let Err(reason) = self.middleware.check(&message).await {
            warn!(reason = %reason, "message blocked by middleware");
            return match message {
                JsonRpcMessage::Request(request) => {
                    self.stats.record_request();
                    Some(self.fail(request.id, RpcError::internal_error(reason)).await)
                }
                _ => None,
            };
        }

        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(response) => {
                debug!(id = ?response.id, "ignoring inbound response");
                None
            }
        }
    }

    /// Route a single request to the method table.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, id = ?request.id, "handling request");
        self.stats.record_request();

        if let Err(error) = validation::validate_request(&request) {
            return self.fail(request.id, error).await;
        }

        match self.dispatch(&request.method, request.params.as_ref()).await {
            Ok(result) => {
                self.stats.record_success();
                JsonRpcResponse::success(request.id, result)
            }
            Err(error) => self.fail(request.id, error).await,
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        if let Err(error) = validation::validate_notification(&notification) {
            warn!(method = %notification.method, error = %error.message, "dropping invalid notification");
            return;
        }

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("client reports initialization complete");
            }
            other => {
                debug!(method = other, "unhandled notification");
            }
        }
    }

    async fn fail(&self, id: RequestId, error: RpcError) -> JsonRpcResponse {
        warn!(code = %error.code, message = %error.message, "request failed");
        self.stats.record_failure(&error.message);
        self.hooks
            .emit(&HookEvent::ErrorRaised {
                message: error.message.clone(),
            })
            .await;
        JsonRpcResponse::error(id, error)
    }

    async fn dispatch(&self, method: &str, params: Option<&Value>) -> Result<Value, RpcError> {
        match method {
            "initialize" => self.handle_initialize(params),
            // Usually a notification; answered only if a client sends it
            // with an id.
            "notifications/initialized" => Ok(json!({ "acknowledged": true })),
            "ping" => Ok(json!({
                "status": "pong",
                "timestamp": utils::generate_timestamp(),
            })),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => self.handle_resources_list(),
            "resources/read" => self.handle_resources_read(params).await,
            "prompts/list" => self.handle_prompts_list(),
            "prompts/get" => self.handle_prompts_get(params).await,
            other => Err(RpcError::method_not_found(other)),
        }
    }

    fn handle_initialize(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        if let Some(params) = params {
            if let Ok(init) = serde_json::from_value::<InitializeParams>(params.clone()) {
                if let Some(client) = init.client_info {
                    info!(client = %client.name, client_version = %client.version, "initialize from client");
                }
                if let Some(requested) = init.protocol_version {
                    if requested != PROTOCOL_VERSION {
                        warn!(
                            requested = %requested,
                            supported = PROTOCOL_VERSION,
                            "client requested a different protocol version"
                        );
                    }
                }
            }
        }

        let capabilities = ServerCapabilities {
            tools: (self.registry.tool_count() > 0).then(ToolsCapability::default),
            resources: (self.registry.resource_count() > 0).then(ResourcesCapability::default),
            prompts: (self.registry.prompt_count() > 0).then(PromptsCapability::default),
        };

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities,
            server_info: Implementation {
                name: self.identity.name.clone(),
                version: self.identity.version.clone(),
            },
            instructions: self.identity.description.clone(),
        };

        to_result_value(result)
    }

    fn handle_tools_list(&self) -> Result<Value, RpcError> {
        let tools = self.registry.tools().iter().map(|t| t.descriptor()).collect();
        to_result_value(ListToolsResult { tools })
    }

    async fn handle_tools_call(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let params = params
            .ok_or_else(|| RpcError::invalid_params("tools/call requires parameters"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("Missing or invalid 'name' parameter"))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let tool = self.registry.tool(name).ok_or_else(|| {
            RpcError::new(ErrorCode::MethodNotFound, format!("Tool '{}' not found", name))
        })?;

        self.hooks
            .emit(&HookEvent::ToolCalled {
                name: name.to_string(),
                arguments: arguments.clone(),
            })
            .await;

        let started = Instant::now();
        let outcome = (tool.handler)(arguments).await;
        let elapsed = started.elapsed();
        self.stats.record_tool_call(elapsed);
        debug!(tool = name, elapsed_ms = elapsed.as_millis() as u64, "tool call finished");

        match outcome {
            Ok(value) => Ok(wrap_tool_result(value)),
            Err(err) => {
                // Domain failure: a successful response with isError set,
                // never a JSON-RPC error.
                let text = format!("Error executing tool {}: {}", name, err.message);
                warn!(tool = name, error = %err.message, "tool handler failed");
                self.stats.record_error(&text);
                self.hooks
                    .emit(&HookEvent::ToolFailed {
                        name: name.to_string(),
                        message: err.message.clone(),
                    })
                    .await;
                to_result_value(ToolCallResult::error_text(text))
            }
        }
    }

    fn handle_resources_list(&self) -> Result<Value, RpcError> {
        let resources = self
            .registry
            .resources()
            .iter()
            .map(|r| r.descriptor())
            .collect();
        to_result_value(ListResourcesResult { resources })
    }

    async fn handle_resources_read(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let params = params
            .ok_or_else(|| RpcError::invalid_params("resources/read requires parameters"))?;
        let uri = params
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("Missing or invalid 'uri' parameter"))?;

        let resource = self.registry.resource(uri).ok_or_else(|| {
            RpcError::new(ErrorCode::MethodNotFound, format!("Resource '{}' not found", uri))
        })?;

        self.hooks
            .emit(&HookEvent::ResourceRead {
                uri: uri.to_string(),
            })
            .await;
        self.stats.record_resource_read();

        let value = (resource.handler)()
            .await
            .map_err(|e| e.into_rpc_error(ErrorCode::InternalError))?;

        let result = ReadResourceResult {
            contents: vec![ResourceContents {
                uri: resource.uri.clone(),
                mime_type: resource.mime_type.clone(),
                text: value_to_text(value),
            }],
        };
        to_result_value(result)
    }

    fn handle_prompts_list(&self) -> Result<Value, RpcError> {
        let prompts = self
            .registry
            .prompts()
            .iter()
            .map(|p| p.descriptor())
            .collect();
        to_result_value(ListPromptsResult { prompts })
    }

    async fn handle_prompts_get(&self, params: Option<&Value>) -> Result<Value, RpcError> {
        let params = params
            .ok_or_else(|| RpcError::invalid_params("prompts/get requires parameters"))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("Missing or invalid 'name' parameter"))?;
        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        let prompt = self.registry.prompt(name).ok_or_else(|| {
            RpcError::new(ErrorCode::MethodNotFound, format!("Prompt '{}' not found", name))
        })?;

        self.hooks
            .emit(&HookEvent::PromptFetched {
                name: name.to_string(),
            })
            .await;
        self.stats.record_prompt_get();

        let value = (prompt.handler)(arguments)
            .await
            .map_err(|e| e.into_rpc_error(ErrorCode::InternalError))?;
        let messages = value.get("messages").cloned().ok_or_else(|| {
            RpcError::internal_error(format!("Prompt '{}' handler returned no messages", name))
        })?;

        to_result_value(GetPromptResult {
            description: prompt.description.clone(),
            messages,
        })
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("server", &self.identity.name)
            .field("tools", &self.registry.tool_count())
            .field("resources", &self.registry.resource_count())
            .field("prompts", &self.registry.prompt_count())
            .finish()
    }
}

/// Wrap a tool handler's return value into the call-result shape, passing
/// through values that already carry a `content` array.
fn wrap_tool_result(value: Value) -> Value {
    if value.get("content").map(Value::is_array).unwrap_or(false) {
        return value;
    }
    json!({
        "content": [{ "type": "text", "text": value_to_text(value) }],
        "isError": false,
    })
}

/// Strings stay verbatim; everything else becomes compact JSON.
fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn to_result_value<T: serde::Serialize>(result: T) -> Result<Value, RpcError> {
    serde_json::to_value(result).map_err(|e| RpcError::internal_error(e.to_string()))
}
