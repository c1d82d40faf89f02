//! Lifecycle hooks: typed publish/subscribe around server and capability
//! events.
//!
//! Subscribers are collected by the builder and frozen at `build()`.
//! Delivery is best-effort: a failing subscriber is logged and the rest
//! still run. Capability events (`ToolCalled`, `ResourceRead`,
//! `PromptFetched`) fire before the handler is invoked.

use crate::transport::TransportKind;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A typed lifecycle event with a named channel.
#[derive(Debug, Clone)]
pub enum HookEvent {
    ServerStarted { transport: TransportKind },
    ServerStopped,
    ErrorRaised { message: String },
    ToolCalled { name: String, arguments: Value },
    ToolFailed { name: String, message: String },
    ResourceRead { uri: String },
    PromptFetched { name: String },
}

impl HookEvent {
    /// Channel name, used for logging and filtering inside subscribers.
    pub fn channel(&self) -> &'static str {
        match self {
            HookEvent::ServerStarted { .. } => "start",
            HookEvent::ServerStopped => "stop",
            HookEvent::ErrorRaised { .. } => "error",
            HookEvent::ToolCalled { .. } => "tool-called",
            HookEvent::ToolFailed { .. } => "tool-error",
            HookEvent::ResourceRead { .. } => "resource-read",
            HookEvent::PromptFetched { .. } => "prompt-fetched",
        }
    }
}

/// A hook subscriber.
#[async_trait]
pub trait Hook: Send + Sync {
    async fn on_event(&self, event: &HookEvent) -> anyhow::Result<()>;
}

/// Adapter wrapping a plain closure as a [`Hook`].
pub struct FnHook<F> {
    f: F,
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&HookEvent) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_event(&self, event: &HookEvent) -> anyhow::Result<()> {
        (self.f)(event)
    }
}

/// Wrap a closure as a hook subscriber.
pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: Fn(&HookEvent) -> anyhow::Result<()> + Send + Sync,
{
    FnHook { f }
}

/// Delivers events to every subscriber, isolating failures.
#[derive(Clone, Default)]
pub struct HookDispatcher {
    hooks: Arc<Vec<Arc<dyn Hook>>>,
}

impl HookDispatcher {
    pub fn new(hooks: Vec<Arc<dyn Hook>>) -> Self {
        HookDispatcher {
            hooks: Arc::new(hooks),
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Deliver `event` to all subscribers in registration order. Failures
    /// are logged and never propagated to the request path.
    pub async fn emit(&self, event: &HookEvent) {
        for hook in self.hooks.iter() {
            if let Err(e) = hook.on_event(event).await {
                tracing::error!(channel = event.channel(), error = %e, "Hook error");
            }
        }
    }
}

impl std::fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookDispatcher")
            .field("subscribers", &self.hooks.len())
            .finish()
    }
}
