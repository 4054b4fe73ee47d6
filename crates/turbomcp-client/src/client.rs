//! The client service surface: a typed RPC facade plus four broadcast
//! subscriptions for responses, notifications, errors, and close events.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{broadcast, RwLock};
use turbomcp_core::{Correlator, Error, RequestId, Result};
use turbomcp_protocol::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use turbomcp_protocol::methods::{notification, request, server_originated};
use turbomcp_protocol::types::completion::{CompletionArgument, CompletionContext, CompletionReference};
use turbomcp_protocol::types::{
    ClientCapabilities, CompletionResult, ElicitationRequest, Implementation, InitializeParams,
    InitializeResult, PromptDescriptor, PromptMessage, ResourceContent, ResourceDescriptor,
    ToolCallResult, ToolDescriptor,
};
use turbomcp_transport::Transport;

use crate::catalog::PromptResourceCatalog;
use crate::elicitation::{DeclineByDefault, ElicitationHandler};

/// A notification routed to subscribers after a `*/list_changed` message.
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    PromptsListChanged,
    ResourcesListChanged,
    ToolsListChanged,
    Other { method: String, params: Option<Value> },
}

pub struct Client {
    transport: Arc<dyn Transport>,
    correlator: Correlator<Value>,
    next_id: AtomicI64,
    elicitation_handler: RwLock<Arc<dyn ElicitationHandler>>,
    on_response: broadcast::Sender<Value>,
    on_notification: broadcast::Sender<NotificationEvent>,
    on_error: broadcast::Sender<String>,
    on_close: broadcast::Sender<()>,
    catalog: OnceLock<Arc<PromptResourceCatalog>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("transport_type", &self.transport.transport_type())
            .field("pending_requests", &self.correlator.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Connect: spawn the background reader loop and return a shared handle.
    pub fn connect(transport: Arc<dyn Transport>) -> Arc<Self> {
        let (on_response, _) = broadcast::channel(64);
        let (on_notification, _) = broadcast::channel(64);
        let (on_error, _) = broadcast::channel(16);
        let (on_close, _) = broadcast::channel(1);

        let client = Arc::new(Self {
            transport,
            correlator: Correlator::new(),
            next_id: AtomicI64::new(1),
            elicitation_handler: RwLock::new(Arc::new(DeclineByDefault)),
            on_response,
            on_notification,
            on_error,
            on_close,
            catalog: OnceLock::new(),
        });
        let _ = client.catalog.set(Arc::new(PromptResourceCatalog::new(client.clone())));

        let reader = client.clone();
        tokio::spawn(async move { reader.run().await });
        client
    }

    pub fn catalog(&self) -> &PromptResourceCatalog {
        self.catalog.get().expect("catalog initialized at construction")
    }

    pub fn subscribe_responses(&self) -> broadcast::Receiver<Value> {
        self.on_response.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<NotificationEvent> {
        self.on_notification.subscribe()
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<String> {
        self.on_error.subscribe()
    }

    pub fn subscribe_close(&self) -> broadcast::Receiver<()> {
        self.on_close.subscribe()
    }

    /// Set (or, with `None`, clear) the elicitation handler at runtime.
    pub async fn set_elicitation_handler(&self, handler: Option<Arc<dyn ElicitationHandler>>) {
        let mut guard = self.elicitation_handler.write().await;
        *guard = handler.unwrap_or_else(|| Arc::new(DeclineByDefault));
    }

    pub async fn initialize(
        &self,
        client_info: Implementation,
        capabilities: ClientCapabilities,
    ) -> Result<InitializeResult> {
        let params = InitializeParams {
            protocol_version: "2024-11-05".to_string(),
            client_info,
            capabilities,
        };
        let result: InitializeResult = self.call(request::INITIALIZE, serde_json::to_value(params)?).await?;
        self.notify(notification::INITIALIZED, None).await?;
        Ok(result)
    }

    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.call(request::TOOLS_LIST, Value::Null).await
    }

    pub async fn call_tool(&self, name: impl Into<String>, arguments: Value) -> Result<ToolCallResult> {
        let params = serde_json::json!({ "name": name.into(), "arguments": arguments });
        self.call(request::TOOLS_CALL, params).await
    }

    pub async fn list_prompts(&self) -> Result<Vec<PromptDescriptor>> {
        self.call(request::PROMPTS_LIST, Value::Null).await
    }

    pub async fn get_prompt(
        &self,
        name: impl Into<String>,
        arguments: std::collections::HashMap<String, String>,
    ) -> Result<Vec<PromptMessage>> {
        let params = serde_json::json!({ "name": name.into(), "arguments": arguments });
        #[derive(serde::Deserialize)]
        struct Resp {
            messages: Vec<PromptMessage>,
        }
        let resp: Resp = self.call(request::PROMPTS_GET, params).await?;
        Ok(resp.messages)
    }

    pub async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>> {
        self.call(request::RESOURCES_LIST, Value::Null).await
    }

    pub async fn read_resource(&self, uri: impl Into<String>) -> Result<Vec<ResourceContent>> {
        let params = serde_json::json!({ "uri": uri.into() });
        #[derive(serde::Deserialize)]
        struct Resp {
            contents: Vec<ResourceContent>,
        }
        let resp: Resp = self.call(request::RESOURCES_READ, params).await?;
        Ok(resp.contents)
    }

    pub async fn complete(
        &self,
        reference: CompletionReference,
        argument: CompletionArgument,
        context: Option<CompletionContext>,
    ) -> Result<CompletionResult> {
        let params = serde_json::json!({ "ref": reference, "argument": argument, "context": context });
        self.call(request::COMPLETION_COMPLETE, params).await
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = RequestId::number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let request = JsonRpcRequest::new(id.clone(), method, Some(params));
        let waiter = self.correlator.register(id.clone(), None);
        self.transport
            .send(&JsonRpcMessage::Request(request))
            .await?;
        let value = waiter.await.into_result()?;
        if let Some(err) = value.get("__error") {
            return Err(Error::internal(err.as_str().unwrap_or("request failed").to_string()));
        }
        Ok(serde_json::from_value(value)?)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let note = JsonRpcNotification::new(method, params);
        self.transport.send(&JsonRpcMessage::Notification(note)).await
    }

    async fn run(self: Arc<Self>) {
        loop {
            match self.transport.receive().await {
                Ok(Some(JsonRpcMessage::Response(resp))) => self.handle_response(resp),
                Ok(Some(JsonRpcMessage::Notification(note))) => self.handle_notification(note).await,
                Ok(Some(JsonRpcMessage::Request(req))) => self.handle_server_request(req).await,
                Ok(None) => {
                    self.correlator.close_all();
                    let _ = self.on_close.send(());
                    break;
                }
                Err(err) => {
                    let _ = self.on_error.send(err.to_string());
                    self.correlator.close_all();
                    let _ = self.on_close.send(());
                    break;
                }
            }
        }
    }

    fn handle_response(&self, resp: JsonRpcResponse) {
        let value = match resp.payload {
            turbomcp_protocol::jsonrpc::JsonRpcResponsePayload::Result { result } => result,
            turbomcp_protocol::jsonrpc::JsonRpcResponsePayload::Error { error } => {
                serde_json::json!({ "__error": error.message })
            }
        };
        let _ = self.on_response.send(value.clone());
        self.correlator.resolve(&resp.id, value);
    }

    async fn handle_notification(&self, note: JsonRpcNotification) {
        let event = match note.method.as_str() {
            m if m == notification::PROMPTS_LIST_CHANGED => {
                self.catalog().invalidate_prompts().await;
                NotificationEvent::PromptsListChanged
            }
            m if m == notification::RESOURCES_LIST_CHANGED => {
                self.catalog().invalidate_resources().await;
                NotificationEvent::ResourcesListChanged
            }
            m if m == notification::TOOLS_LIST_CHANGED => NotificationEvent::ToolsListChanged,
            other => NotificationEvent::Other {
                method: other.to_string(),
                params: note.params,
            },
        };
        let _ = self.on_notification.send(event);
    }

    async fn handle_server_request(&self, req: JsonRpcRequest) {
        if req.method != server_originated::ELICITATION_CREATE {
            tracing::debug!(method = %req.method, "unhandled server-originated request");
            return;
        }
        let params: ElicitationRequest = match req
            .params
            .ok_or_else(|| Error::invalid_params("missing params"))
            .and_then(|p| serde_json::from_value(p).map_err(Error::from))
        {
            Ok(p) => p,
            Err(err) => {
                let _ = self.on_error.send(err.to_string());
                return;
            }
        };
        let handler = self.elicitation_handler.read().await.clone();
        let result = handler.handle(params.message, params.requested_schema).await;
        let response = JsonRpcResponse::success(req.id, serde_json::to_value(result).unwrap_or(Value::Null));
        let _ = self.transport.send(&JsonRpcMessage::Response(response)).await;
    }
}
