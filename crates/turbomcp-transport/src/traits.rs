//! The abstract transport contract both variants implement.

use async_trait::async_trait;
use turbomcp_core::Result;
use turbomcp_protocol::JsonRpcMessage;

/// Coarse connection lifecycle state, reported for diagnostics and used by
/// the dispatcher to decide when to transition a session to `Closing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Connecting,
    Connected,
    Disconnecting,
    Disconnected,
}

/// A bidirectional channel over which JSON-RPC envelopes flow one at a time.
///
/// Implementors serialize concurrent writers internally: a session's writes
/// to its transport go through a per-session mutex or a single-writer
/// channel, so callers never need their own external lock around `send`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable variant name, used in logs and diagnostics.
    fn transport_type(&self) -> &'static str;

    /// Current lifecycle state.
    fn state(&self) -> TransportState;

    /// Write one envelope. Resolves once the frame has been handed to the
    /// underlying stream (for stdio: flushed; for HTTP+SSE: the SSE write
    /// queued or the POST response decoded).
    async fn send(&self, message: &JsonRpcMessage) -> Result<()>;

    /// Read the next complete envelope, or `Ok(None)` on a clean close
    /// (EOF, or stream closed by the peer). Implementations guard their
    /// read-side state internally so this can be called through a shared
    /// `Arc<dyn Transport>` from a single reader task.
    async fn receive(&self) -> Result<Option<JsonRpcMessage>>;

    /// Tear down the transport. Idempotent.
    async fn close(&self) -> Result<()>;
}
