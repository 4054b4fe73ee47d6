//! The four service registries: tools, prompts, resources, completions.
//! All four share one shape — insert with optional overwrite, list via
//! defensive clone in stable order, lookup, invoke — implemented
//! once here and specialized per service in the sibling modules.

pub mod completions;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use completions::CompletionRegistry;
pub use prompts::PromptRegistry;
pub use resources::ResourceRegistry;
pub use tools::ToolRegistry;

use std::sync::Arc;

use turbomcp_core::SessionId;

/// Per-invocation context handed to every tool/prompt/resource/completion
/// handler. Carries the session id explicitly (design note iii) rather than
/// through an ambient thread-local, so handlers that issue nested
/// server-originated requests (elicitation) know which session to target.
#[derive(Clone)]
pub struct InvocationContext {
    pub session_id: SessionId,
    pub cancellation: turbomcp_core::CancellationToken,
    elicit: Arc<dyn ElicitSink>,
}

/// Narrow seam the elicitation subsystem implements so registries don't
/// depend on `turbomcp-server`'s dispatcher directly.
#[async_trait::async_trait]
pub trait ElicitSink: Send + Sync {
    async fn elicit(
        &self,
        session_id: SessionId,
        message: String,
        requested_schema: serde_json::Value,
        cancellation: turbomcp_core::CancellationToken,
    ) -> turbomcp_core::Result<turbomcp_protocol::types::ElicitationResult>;
}

impl InvocationContext {
    pub fn new(
        session_id: SessionId,
        cancellation: turbomcp_core::CancellationToken,
        elicit: Arc<dyn ElicitSink>,
    ) -> Self {
        Self {
            session_id,
            cancellation,
            elicit,
        }
    }

    /// Issue a nested `elicitation/create` request to this session's client
    /// and await the resolved answer.
    pub async fn elicit(
        &self,
        message: impl Into<String>,
        requested_schema: serde_json::Value,
    ) -> turbomcp_core::Result<turbomcp_protocol::types::ElicitationResult> {
        self.elicit
            .elicit(
                self.session_id,
                message.into(),
                requested_schema,
                self.cancellation.child(),
            )
            .await
    }
}

/// A broadcast-based emit hook for `*/list_changed` notifications (design
/// note vii): registries fire `notify_changed` after any mutation without
/// prescribing what "mutation" means to callers that build on them.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: tokio::sync::broadcast::Sender<()>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        let (sender, _) = tokio::sync::broadcast::channel(16);
        Self { sender }
    }
}

impl ChangeNotifier {
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    pub fn notify_changed(&self) {
        let _ = self.sender.send(());
    }
}
