//! Server-originated elicitation.
//!
//! A tool's [`InvocationContext::elicit`] call lands here: a fresh id is
//! allocated, an `elicitation/create` request is written to the session's
//! transport, and the call suspends on the session's outbound correlator
//! until the client answers, the request is cancelled, or the transport
//! closes.

use std::sync::Arc;

use async_trait::async_trait;
use turbomcp_core::{CancellationToken, Error, ErrorKind, RequestId, Result, SessionId};
use turbomcp_protocol::jsonrpc::{JsonRpcMessage, JsonRpcNotification, JsonRpcRequest};
use turbomcp_protocol::methods::notification::CANCELLED;
use turbomcp_protocol::methods::server_originated::ELICITATION_CREATE;
use turbomcp_protocol::types::{ElicitationRequest, ElicitationResult};
use turbomcp_transport::Transport;

use crate::registry::ElicitSink;
use crate::session::SharedSession;

/// Assigns request ids for server-originated requests on a session.
pub struct ElicitationService {
    transport: Arc<dyn Transport>,
    session: SharedSession,
    next_id: std::sync::atomic::AtomicI64,
}

impl ElicitationService {
    pub fn new(transport: Arc<dyn Transport>, session: SharedSession) -> Self {
        Self {
            transport,
            session,
            next_id: std::sync::atomic::AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl ElicitSink for ElicitationService {
    async fn elicit(
        &self,
        session_id: SessionId,
        message: String,
        requested_schema: serde_json::Value,
        cancellation: CancellationToken,
    ) -> Result<ElicitationResult> {
        debug_assert_eq!(session_id, self.session.id);
        let id = RequestId::number(
            self.next_id.fetch_add(1, std::sync::atomic::Ordering::SeqCst),
        );
        let params = ElicitationRequest {
            message,
            requested_schema,
        };
        let request = JsonRpcRequest::new(
            id.clone(),
            ELICITATION_CREATE,
            Some(serde_json::to_value(params)?),
        );
        let waiter = self.session.outbound.register(id.clone(), None);
        self.transport
            .send(&JsonRpcMessage::Request(request))
            .await?;

        tokio::select! {
            outcome = waiter => {
                let value = outcome.into_result()?;
                Ok(serde_json::from_value(value)?)
            }
            _ = cancellation.cancelled() => {
                self.session.outbound.cancel(&id);
                let note = JsonRpcNotification::new(
                    CANCELLED,
                    Some(serde_json::json!({ "requestId": id })),
                );
                let _ = self.transport.send(&JsonRpcMessage::Notification(note)).await;
                Err(Error::new(ErrorKind::Cancelled))
            }
        }
    }
}
