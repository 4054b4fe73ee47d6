//! The completion registry: `completion/complete`.
//!
//! Keyed by `(refType, identifier)`; registering any binding implicitly
//! advertises the `completions` capability (handled by the builder, which
//! checks [`CompletionRegistry::is_empty`] at `initialize` time).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use turbomcp_core::{Error, Result};
use turbomcp_protocol::types::{CompletionArgument, CompletionReference, CompletionResult};
use turbomcp_protocol::types::completion::CompletionContext;

#[async_trait]
pub trait CompletionHandler: Send + Sync {
    async fn complete(
        &self,
        argument: CompletionArgument,
        context: Option<CompletionContext>,
    ) -> Result<CompletionResult>;
}

#[async_trait]
impl<F, Fut> CompletionHandler for F
where
    F: Fn(CompletionArgument, Option<CompletionContext>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<CompletionResult>> + Send,
{
    async fn complete(
        &self,
        argument: CompletionArgument,
        context: Option<CompletionContext>,
    ) -> Result<CompletionResult> {
        (self)(argument, context).await
    }
}

/// Key is `(refType, identifier)`: one handler per key.
#[derive(Default)]
pub struct CompletionRegistry {
    handlers: std::sync::Mutex<HashMap<(String, String), Arc<dyn CompletionHandler>>>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, reference_kind: &str, identifier: &str, handler: Arc<dyn CompletionHandler>) {
        self.handlers
            .lock()
            .unwrap()
            .insert((reference_kind.to_string(), identifier.to_string()), handler);
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.lock().unwrap().is_empty()
    }

    pub async fn complete(
        &self,
        reference: &CompletionReference,
        argument: CompletionArgument,
        context: Option<CompletionContext>,
    ) -> Result<CompletionResult> {
        let key = (reference.kind().to_string(), reference.identifier().to_string());
        let handler = self
            .handlers
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::invalid_params(format!("no completion handler for {key:?}")))?;
        handler.complete(argument, context).await
    }
}
