//! Request middleware: ordered interceptors that see every parsed message
//! before it is routed.
//!
//! An interceptor blocks by returning an error. The transport answers a
//! blocked request with INTERNAL_ERROR carrying the reason; a blocked
//! notification is silently dropped. Later interceptors do not run once one
//! has blocked.

use crate::protocol::JsonRpcMessage;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Why a middleware rejected a message.
#[derive(Error, Debug)]
pub enum MiddlewareError {
    /// Deliberate rejection with a reason for the caller
    #[error("{reason}")]
    Blocked { reason: String },

    /// Unexpected failure inside the interceptor, treated as a block
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl MiddlewareError {
    pub fn blocked(reason: impl Into<String>) -> Self {
        MiddlewareError::Blocked {
            reason: reason.into(),
        }
    }
}

/// An async interceptor over parsed messages.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn on_message(&self, message: &JsonRpcMessage) -> Result<(), MiddlewareError>;
}

/// Adapter wrapping a plain closure as a [`Middleware`].
pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&JsonRpcMessage) -> Result<(), MiddlewareError> + Send + Sync,
{
    async fn on_message(&self, message: &JsonRpcMessage) -> Result<(), MiddlewareError> {
        (self.f)(message)
    }
}

/// Wrap a closure as middleware.
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(&JsonRpcMessage) -> Result<(), MiddlewareError> + Send + Sync,
{
    FnMiddleware { f }
}

/// The ordered pipeline, frozen at `build()`.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    chain: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new(chain: Vec<Arc<dyn Middleware>>) -> Self {
        MiddlewareChain {
            chain: Arc::new(chain),
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Run every interceptor in registration order; the first failure wins
    /// and its message becomes the block reason.
    pub async fn check(&self, message: &JsonRpcMessage) -> Result<(), String> {
        for middleware in self.chain.iter() {
            if let Err(e) = middleware.on_message(message).await {
                return Err(e.to_string());
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareChain")
            .field("interceptors", &self.chain.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::JsonRpcRequest;
    use serde_json::json;
    use std::sync::Mutex;

    fn request(method: &str) -> JsonRpcMessage {
        JsonRpcMessage::Request(JsonRpcRequest::new(json!(1), method, None))
    }

    struct RecordingMiddleware {
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
        block: bool,
    }

    #[async_trait]
    impl Middleware for RecordingMiddleware {
        async fn on_message(&self, _message: &JsonRpcMessage) -> Result<(), MiddlewareError> {
            self.order.lock().unwrap().push(self.label);
            if self.block {
                Err(MiddlewareError::blocked(format!("{} says no", self.label)))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_runs_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new(vec![
            Arc::new(RecordingMiddleware {
                label: "first",
                order: Arc::clone(&order),
                block: false,
            }),
            Arc::new(RecordingMiddleware {
                label: "second",
                order: Arc::clone(&order),
                block: false,
            }),
        ]);

        chain.check(&request("ping")).await.unwrap();
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_first_block_stops_pipeline() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let chain = MiddlewareChain::new(vec![
            Arc::new(RecordingMiddleware {
                label: "gate",
                order: Arc::clone(&order),
                block: true,
            }),
            Arc::new(RecordingMiddleware {
                label: "never",
                order: Arc::clone(&order),
                block: false,
            }),
        ]);

        let reason = chain.check(&request("ping")).await.unwrap_err();
        assert_eq!(reason, "gate says no");
        assert_eq!(*order.lock().unwrap(), vec!["gate"]);
    }

    #[tokio::test]
    async fn test_internal_error_treated_as_block() {
        let chain = MiddlewareChain::new(vec![Arc::new(middleware_fn(|_msg| {
            Err(MiddlewareError::Internal(anyhow::anyhow!("lookup failed")))
        }))]);

        let reason = chain.check(&request("tools/list")).await.unwrap_err();
        assert_eq!(reason, "lookup failed");
    }

    #[tokio::test]
    async fn test_fn_middleware_can_filter_by_method() {
        let chain = MiddlewareChain::new(vec![Arc::new(middleware_fn(|msg| {
            if let JsonRpcMessage::Request(req) = msg {
                if req.method == "tools/call" {
                    return Err(MiddlewareError::blocked("tool calls disabled"));
                }
            }
            Ok(())
        }))]);

        assert!(chain.check(&request("tools/list")).await.is_ok());
        assert_eq!(
            chain.check(&request("tools/call")).await.unwrap_err(),
            "tool calls disabled"
        );
    }

    #[tokio::test]
    async fn test_empty_chain_passes() {
        let chain = MiddlewareChain::default();
        assert!(chain.is_empty());
        assert!(chain.check(&request("ping")).await.is_ok());
    }
}
