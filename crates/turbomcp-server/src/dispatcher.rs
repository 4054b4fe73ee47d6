//! The session dispatcher: reads envelopes off a transport and routes them
//! to request handlers, notification handlers, or the session's
//! pending-outbound correlator.
//!
//! Each accepted request is spawned onto its own task so one slow handler
//! never blocks another on the same session; responses are therefore
//! emitted in completion order, not arrival order.

use std::sync::Arc;

use serde_json::Value;
use turbomcp_core::{CancellationToken, Error, ErrorKind, Result, SessionId};
use turbomcp_protocol::jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcResponse};
use turbomcp_protocol::methods::{notification, request};
use turbomcp_protocol::types::{
    CompletionArgument, CompletionReference, Implementation, InitializeParams, InitializeResult,
    PromptGetParams, ResourceReadParams, ServerCapabilities, ToolCallParams,
};
use turbomcp_transport::Transport;

use crate::elicitation::ElicitationService;
use crate::registry::{CompletionRegistry, ElicitSink, InvocationContext, PromptRegistry, ResourceRegistry, ToolRegistry};
use crate::session::{SessionState, SharedSession};

/// Negotiates the protocol version the server accepts, in descending
/// preference order (first entry is the highest version it understands).
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05"];

/// Process-wide service surface a dispatcher serves to every session.
pub struct Dispatcher {
    pub tools: Arc<ToolRegistry>,
    pub prompts: Arc<PromptRegistry>,
    pub resources: Arc<ResourceRegistry>,
    pub completions: Arc<CompletionRegistry>,
    pub server_info: Implementation,
    /// Cancellation trackers for in-flight *inbound* requests, keyed by
    /// their id, so a `notifications/cancelled{requestId}` can reach the
    /// right handler.
    inflight: dashmap::DashMap<(SessionId, turbomcp_core::RequestId), CancellationToken>,
}

impl Dispatcher {
    pub fn new(server_info: Implementation) -> Self {
        Self {
            tools: Arc::new(ToolRegistry::new()),
            prompts: Arc::new(PromptRegistry::new()),
            resources: Arc::new(ResourceRegistry::new()),
            completions: Arc::new(CompletionRegistry::new()),
            server_info,
            inflight: dashmap::DashMap::new(),
        }
    }

    fn capabilities(&self) -> ServerCapabilities {
        let mut caps = ServerCapabilities::default();
        if !self.tools.is_empty() {
            caps = caps.with_tools(true);
        }
        if !self.prompts.is_empty() {
            caps = caps.with_prompts(true);
        }
        if !self.resources.is_empty() {
            caps = caps.with_resources(true);
        }
        if !self.completions.is_empty() {
            caps = caps.with_completions();
        }
        caps
    }

    /// Drive one session to completion: reads frames from `transport` until
    /// it closes, dispatching each to a handler or the correlator.
    pub async fn run(self: Arc<Self>, transport: Arc<dyn Transport>, session: SharedSession) {
        let elicitation = Arc::new(ElicitationService::new(transport.clone(), session.clone()));

        let forwarders = [
            spawn_list_changed_forwarder(
                transport.clone(),
                self.tools.subscribe_list_changed(),
                notification::TOOLS_LIST_CHANGED,
            ),
            spawn_list_changed_forwarder(
                transport.clone(),
                self.prompts.subscribe_list_changed(),
                notification::PROMPTS_LIST_CHANGED,
            ),
            spawn_list_changed_forwarder(
                transport.clone(),
                self.resources.subscribe_list_changed(),
                notification::RESOURCES_LIST_CHANGED,
            ),
        ];

        loop {
            match transport.receive().await {
                Ok(Some(message)) => {
                    self.clone()
                        .handle_message(transport.clone(), session.clone(), elicitation.clone(), message)
                        .await;
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "transport read failed");
                    break;
                }
            }
            if session.state() == SessionState::Closed {
                break;
            }
        }
        session.begin_closing();
        session.close();
        for handle in forwarders {
            handle.abort();
        }
    }

    async fn handle_message(
        self: Arc<Self>,
        transport: Arc<dyn Transport>,
        session: SharedSession,
        elicitation: Arc<ElicitationService>,
        message: JsonRpcMessage,
    ) {
        match message {
            JsonRpcMessage::Request(req) => {
                if !session.state().accepts(&req.method) {
                    let err = JsonRpcError::new(
                        ErrorKind::NotInitialized.code(),
                        "server not initialized",
                    );
                    let _ = transport
                        .send(&JsonRpcMessage::Response(JsonRpcResponse::error(req.id, err)))
                        .await;
                    return;
                }
                let cancellation = session.cancellation_root.child();
                self.inflight
                    .insert((session.id, req.id.clone()), cancellation.clone());
                let dispatcher = self.clone();
                let transport = transport.clone();
                let session = session.clone();
                tokio::spawn(async move {
                    let id = req.id.clone();
                    let result = dispatcher
                        .dispatch_request(&req.method, req.params, &session, elicitation, cancellation)
                        .await;
                    dispatcher.inflight.remove(&(session.id, id.clone()));
                    let response = match result {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(err) => JsonRpcResponse::error(id, JsonRpcError::from(&err)),
                    };
                    let _ = transport.send(&JsonRpcMessage::Response(response)).await;
                });
            }
            JsonRpcMessage::Notification(note) => {
                self.dispatch_notification(&note.method, note.params, &session);
            }
            JsonRpcMessage::Response(resp) => {
                let value = match resp.payload {
                    turbomcp_protocol::jsonrpc::JsonRpcResponsePayload::Result { result } => result,
                    turbomcp_protocol::jsonrpc::JsonRpcResponsePayload::Error { error } => {
                        serde_json::json!({"__error": error.message})
                    }
                };
                session.outbound.resolve(&resp.id, value);
            }
        }
    }

    async fn dispatch_request(
        &self,
        method: &str,
        params: Option<Value>,
        session: &SharedSession,
        elicitation: Arc<ElicitationService>,
        cancellation: CancellationToken,
    ) -> Result<Value> {
        let params = params.unwrap_or(Value::Null);
        match method {
            m if m == request::INITIALIZE => self.handle_initialize(params, session),
            m if m == request::PING => Ok(serde_json::json!({})),
            m if m == request::TOOLS_LIST => {
                Ok(serde_json::to_value(self.tools.list())?)
            }
            m if m == request::TOOLS_CALL => {
                let call: ToolCallParams = serde_json::from_value(params)
                    .map_err(|e| Error::invalid_params(e.to_string()))?;
                let ctx = InvocationContext::new(
                    session.id,
                    cancellation,
                    elicitation as Arc<dyn ElicitSink>,
                );
                let result = self.tools.call(&call.name, call.arguments, ctx).await?;
                Ok(serde_json::to_value(result)?)
            }
            m if m == request::PROMPTS_LIST => Ok(serde_json::to_value(self.prompts.list())?),
            m if m == request::PROMPTS_GET => {
                let get: PromptGetParams = serde_json::from_value(params)
                    .map_err(|e| Error::invalid_params(e.to_string()))?;
                let messages = self.prompts.get(&get.name, get.arguments, cancellation).await?;
                Ok(serde_json::json!({ "messages": messages }))
            }
            m if m == request::RESOURCES_LIST => Ok(serde_json::to_value(self.resources.list())?),
            m if m == request::RESOURCES_READ => {
                let read: ResourceReadParams = serde_json::from_value(params)
                    .map_err(|e| Error::invalid_params(e.to_string()))?;
                let contents = self.resources.read(&read.uri).await?;
                Ok(serde_json::json!({ "contents": contents }))
            }
            m if m == request::COMPLETION_COMPLETE => {
                #[derive(serde::Deserialize)]
                struct Params {
                    #[serde(rename = "ref")]
                    reference: CompletionReference,
                    argument: CompletionArgument,
                    #[serde(default)]
                    context: Option<turbomcp_protocol::types::completion::CompletionContext>,
                }
                let p: Params = serde_json::from_value(params)
                    .map_err(|e| Error::invalid_params(e.to_string()))?;
                let result = self
                    .completions
                    .complete(&p.reference, p.argument, p.context)
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            other => Err(Error::method_not_found(other)),
        }
    }

    fn handle_initialize(&self, params: Value, session: &SharedSession) -> Result<Value> {
        let params: InitializeParams =
            serde_json::from_value(params).map_err(|e| Error::invalid_params(e.to_string()))?;
        session.begin_initializing();

        // Highest version we support that is <= the client's; versions sort
        // lexically here because the only format in use, `YYYY-MM-DD`, is
        // lexically ordered. Disjoint (client's version older than anything
        // we support) is an `InvalidParams` error, not a silent fallback.
        let negotiated = SUPPORTED_PROTOCOL_VERSIONS
            .iter()
            .filter(|v| **v <= params.protocol_version.as_str())
            .max()
            .copied()
            .ok_or_else(|| {
                Error::invalid_params(format!(
                    "no compatible protocol version for client version {}",
                    params.protocol_version
                ))
            })?;

        *session.negotiated_version.lock().unwrap() = Some(negotiated.to_string());
        *session.peer_info.lock().unwrap() = Some(params.client_info);
        *session.peer_capabilities.lock().unwrap() = Some(params.capabilities);

        let result = InitializeResult {
            protocol_version: negotiated.to_string(),
            server_info: self.server_info.clone(),
            capabilities: self.capabilities(),
            instructions: None,
        };
        Ok(serde_json::to_value(result)?)
    }

    fn dispatch_notification(&self, method: &str, params: Option<Value>, session: &SharedSession) {
        match method {
            m if m == notification::INITIALIZED => {
                if !session.mark_ready() {
                    tracing::warn!("notifications/initialized received outside Initializing state");
                }
            }
            m if m == notification::CANCELLED => {
                if let Some(params) = params {
                    if let Ok(request_id) =
                        serde_json::from_value::<CancelledParams>(params).map(|p| p.request_id)
                    {
                        if let Some((_, token)) = self.inflight.remove(&(session.id, request_id)) {
                            token.cancel();
                        }
                    }
                }
            }
            _ => {
                tracing::debug!(method, "no handler for notification; dropped");
            }
        }
    }
}

/// Forward every firing of a registry's change notifier to `transport` as
/// a `*_list_changed` notification, for as long as the transport accepts
/// writes. The caller aborts the returned handle when the session ends.
fn spawn_list_changed_forwarder(
    transport: Arc<dyn Transport>,
    mut changes: tokio::sync::broadcast::Receiver<()>,
    method: &'static str,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(()) => {
                    let note = JsonRpcNotification::new(method, None);
                    if transport.send(&JsonRpcMessage::Notification(note)).await.is_err() {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[derive(serde::Deserialize)]
struct CancelledParams {
    #[serde(rename = "requestId")]
    request_id: turbomcp_core::RequestId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use turbomcp_protocol::types::{Implementation, PromptDescriptor};

    #[test]
    fn capabilities_reflect_registered_feature_kinds() {
        let dispatcher = Dispatcher::new(Implementation {
            name: "test".into(),
            version: "0.1.0".into(),
        });
        let empty = dispatcher.capabilities();
        assert!(empty.tools.is_none());
        assert!(empty.prompts.is_none());
        assert!(empty.resources.is_none());

        dispatcher
            .prompts
            .register(
                PromptDescriptor::new("greet"),
                Arc::new(|_args, _cancellation| async { Ok(vec![]) }),
                false,
            )
            .unwrap();

        let caps = dispatcher.capabilities();
        assert!(caps.prompts.is_some());
        assert!(caps.tools.is_none());
        assert!(caps.resources.is_none());
    }
}
