//! Server side of the HTTP+SSE transport.
//!
//! [`SseHub`] is the ingress host named in design note (v): it owns the
//! axum router, accepts new SSE connections, and feeds inbound POST bodies
//! into the session's [`SseServerTransport`]. The transport itself never
//! polls HTTP directly — it only writes onto a channel the SSE stream
//! consumes and reads from a channel the POST handler fills.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use futures::stream::Stream;
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use turbomcp_core::{Error, ErrorKind, Result, SessionId};
use turbomcp_protocol::jsonrpc::{self, JsonRpcMessage};

use crate::http_sse::auth::{auth_gate_middleware, AuthGate};
use crate::traits::{Transport, TransportState};

const CHANNEL_CAPACITY: usize = 256;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

struct SessionEntry {
    inbound_tx: mpsc::Sender<JsonRpcMessage>,
}

/// Shared registry mapping `sessionId` to its live stream sink, and the
/// axum router that serves both the SSE GET endpoint and the POST endpoint.
#[derive(Clone)]
pub struct SseHub {
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    sse_path: Arc<str>,
    message_path: Arc<str>,
    on_accept: Arc<dyn Fn(SseServerTransport) + Send + Sync>,
    auth: Option<Arc<AuthGate>>,
}

impl SseHub {
    /// `on_accept` is the session-accept callback: it hands each freshly
    /// connected transport to whatever owns session construction (typically
    /// `turbomcp-server`'s dispatcher).
    pub fn new(
        sse_path: impl Into<String>,
        message_path: impl Into<String>,
        on_accept: impl Fn(SseServerTransport) + Send + Sync + 'static,
    ) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            sse_path: sse_path.into().into(),
            message_path: message_path.into().into(),
            on_accept: Arc::new(on_accept),
            auth: None,
        }
    }

    /// Gate every SSE/message request behind `gate`'s bearer-token check.
    /// The gate's own `.well-known` discovery routes stay unauthenticated.
    #[must_use]
    pub fn with_auth(mut self, gate: AuthGate) -> Self {
        self.auth = Some(Arc::new(gate));
        self
    }

    /// Build the axum router exposing the SSE stream and message endpoints,
    /// gated by the configured [`AuthGate`] (if any) and wrapped in the
    /// tracing/timeout middleware stack.
    pub fn router(&self) -> Router {
        let mcp_router = Router::new()
            .route(&self.sse_path, get(sse_handler))
            .route(&format!("{}/{{session_id}}", self.message_path), post(post_handler))
            .with_state(self.clone());

        let router = match &self.auth {
            Some(gate) => {
                let gated = mcp_router.layer(middleware::from_fn_with_state(
                    gate.clone(),
                    auth_gate_middleware,
                ));
                gated.merge(gate.metadata_router())
            }
            None => mcp_router,
        };

        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(DEFAULT_REQUEST_TIMEOUT)),
        )
    }

    /// Create a new session: registers it in the hub and returns the
    /// transport handle plus the SSE byte stream axum should serve.
    fn accept(
        &self,
    ) -> (
        SessionId,
        SseServerTransport,
        impl Stream<Item = std::result::Result<Event, std::convert::Infallible>>,
    ) {
        let session_id = SessionId::generate();
        let (outbound_tx, outbound_rx) = mpsc::channel::<JsonRpcMessage>(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<JsonRpcMessage>(CHANNEL_CAPACITY);

        self.sessions
            .insert(session_id, SessionEntry { inbound_tx });

        let endpoint_url = format!("{}/{session_id}", self.message_path);
        let endpoint_event = futures::stream::once(async move {
            Ok(Event::default().event("endpoint").data(endpoint_url))
        });

        let message_stream = tokio_stream_from_receiver(outbound_rx).map(move |msg| {
            let data = jsonrpc::serialize_message(&msg).unwrap_or_default();
            Ok(Event::default().event("message").data(data))
        });

        let sessions = self.sessions.clone();
        let guarded_stream = GuardedStream {
            inner: endpoint_event.chain(message_stream),
            _guard: SessionGuard { sessions, session_id },
        };

        let transport = SseServerTransport {
            session_id,
            outbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            state: std::sync::atomic::AtomicU8::new(0),
        };

        (session_id, transport, guarded_stream)
    }

    /// Drop a session's registration; subsequent POSTs for it return 404.
    pub fn close_session(&self, session_id: SessionId) {
        self.sessions.remove(&session_id);
    }
}

/// Drops the session's hub registration when the SSE stream itself ends
/// (client disconnected), so late POSTs are rejected with 404.
struct SessionGuard {
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    session_id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.sessions.remove(&self.session_id);
    }
}

struct GuardedStream<S> {
    inner: S,
    _guard: SessionGuard,
}

impl<S: Stream + Unpin> Stream for GuardedStream<S> {
    type Item = S::Item;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let this = self.get_mut();
        std::pin::Pin::new(&mut this.inner).poll_next(cx)
    }
}

fn tokio_stream_from_receiver(
    rx: mpsc::Receiver<JsonRpcMessage>,
) -> impl Stream<Item = JsonRpcMessage> {
    futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|msg| (msg, rx))
    })
}

async fn sse_handler(
    State(hub): State<SseHub>,
) -> Sse<impl Stream<Item = std::result::Result<Event, std::convert::Infallible>>> {
    let (session_id, transport, stream) = hub.accept();
    tracing::info!(%session_id, "sse session accepted");
    (hub.on_accept)(transport);
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn post_handler(
    State(hub): State<SseHub>,
    Path(session_id): Path<String>,
    body: axum::body::Bytes,
) -> StatusCode {
    let Ok(session_id) = session_id.parse::<SessionId>() else {
        return StatusCode::NOT_FOUND;
    };
    let Some(entry) = hub.sessions.get(&session_id) else {
        return StatusCode::NOT_FOUND;
    };
    let text = String::from_utf8_lossy(&body);
    match jsonrpc::parse_message(&text) {
        Ok(msg) => {
            if entry.inbound_tx.send(msg).await.is_err() {
                return StatusCode::NOT_FOUND;
            }
            StatusCode::ACCEPTED
        }
        Err(err) => {
            tracing::warn!(error = %err, "invalid JSON-RPC frame posted");
            StatusCode::BAD_REQUEST
        }
    }
}

/// The server's half of one session's HTTP+SSE transport. `send` pushes onto
/// the SSE stream's outbound channel; `receive` drains frames the hub
/// forwarded from POSTs.
pub struct SseServerTransport {
    session_id: SessionId,
    outbound_tx: mpsc::Sender<JsonRpcMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<JsonRpcMessage>>,
    state: std::sync::atomic::AtomicU8,
}

impl SseServerTransport {
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }
}

#[async_trait]
impl Transport for SseServerTransport {
    fn transport_type(&self) -> &'static str {
        "http+sse"
    }

    fn state(&self) -> TransportState {
        match self.state.load(std::sync::atomic::Ordering::SeqCst) {
            0 => TransportState::Connected,
            _ => TransportState::Disconnected,
        }
    }

    async fn send(&self, message: &JsonRpcMessage) -> Result<()> {
        self.outbound_tx
            .send(message.clone())
            .await
            .map_err(|_| Error::new(ErrorKind::TransportClosed))
    }

    async fn receive(&self) -> Result<Option<JsonRpcMessage>> {
        let mut rx = self.inbound_rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn close(&self) -> Result<()> {
        self.state
            .store(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

use futures::StreamExt as _;

#[cfg(test)]
mod tests {
    use super::*;
    use turbomcp_core::RequestId;
    use turbomcp_protocol::jsonrpc::JsonRpcRequest;

    #[tokio::test]
    async fn accept_registers_session_and_send_reaches_outbound() {
        let hub = SseHub::new("/sse", "/messages", |_transport| {});
        let (session_id, transport, _stream) = hub.accept();
        assert!(hub.sessions.contains_key(&session_id));
        let req = JsonRpcRequest::new(RequestId::number(1), "ping", None);
        transport.send(&JsonRpcMessage::Request(req)).await.unwrap();
    }

    #[tokio::test]
    async fn close_session_removes_hub_entry() {
        let hub = SseHub::new("/sse", "/messages", |_transport| {});
        let (session_id, _transport, _stream) = hub.accept();
        hub.close_session(session_id);
        assert!(!hub.sessions.contains_key(&session_id));
    }
}
