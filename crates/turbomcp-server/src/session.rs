//! The session lifecycle state machine.

use std::sync::Arc;

use turbomcp_core::{CancellationToken, Correlator, SessionId};
use turbomcp_protocol::types::{ClientCapabilities, Implementation, ServerCapabilities};

/// A session's lifecycle state. Transitions are monotonic except that the
/// terminal state, `Closed`, is never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    New,
    Initializing,
    Ready,
    Closing,
    Closed,
}

impl SessionState {
    /// Whether a request for `method` is accepted while in this state.
    /// Only `initialize` is accepted before `Ready`.
    pub fn accepts(&self, method: &str) -> bool {
        match self {
            Self::New | Self::Initializing => method == turbomcp_protocol::methods::request::INITIALIZE,
            Self::Ready => true,
            Self::Closing | Self::Closed => false,
        }
    }
}

/// Server-side session state: negotiated protocol info, the elicitation
/// correlator for server-originated requests, and the cancellation root for
/// every handler running on this session.
pub struct Session {
    pub id: SessionId,
    state: std::sync::Mutex<SessionState>,
    pub peer_info: std::sync::Mutex<Option<Implementation>>,
    pub peer_capabilities: std::sync::Mutex<Option<ClientCapabilities>>,
    pub local_capabilities: std::sync::Mutex<ServerCapabilities>,
    pub negotiated_version: std::sync::Mutex<Option<String>>,
    /// Correlates server-originated requests (elicitation) with the
    /// client's eventual reply.
    pub outbound: Correlator<serde_json::Value>,
    pub cancellation_root: CancellationToken,
}

impl Session {
    pub fn new(local_capabilities: ServerCapabilities) -> Self {
        Self {
            id: SessionId::generate(),
            state: std::sync::Mutex::new(SessionState::New),
            peer_info: std::sync::Mutex::new(None),
            peer_capabilities: std::sync::Mutex::new(None),
            local_capabilities: std::sync::Mutex::new(local_capabilities),
            negotiated_version: std::sync::Mutex::new(None),
            outbound: Correlator::new(),
            cancellation_root: CancellationToken::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap()
    }

    /// Move to `Initializing`. Only valid from `New`.
    pub fn begin_initializing(&self) {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::New {
            *state = SessionState::Initializing;
        }
    }

    /// Move to `Ready` on `notifications/initialized`. Only valid from
    /// `Initializing`.
    pub fn mark_ready(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if *state == SessionState::Initializing {
            *state = SessionState::Ready;
            true
        } else {
            false
        }
    }

    pub fn begin_closing(&self) {
        let mut state = self.state.lock().unwrap();
        if *state != SessionState::Closed {
            *state = SessionState::Closing;
        }
    }

    /// Terminal transition: drains every pending outbound awaiter and fires
    /// the session's cancellation root, which cascades to every handler and
    /// nested outbound request still in flight.
    pub fn close(&self) {
        {
            let mut state = self.state.lock().unwrap();
            *state = SessionState::Closed;
        }
        self.outbound.close_all();
        self.cancellation_root.cancel();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

/// Shared handle to a session, cheaply cloned across handler tasks.
pub type SharedSession = Arc<Session>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_initialize_rejected_before_ready() {
        assert!(SessionState::New.accepts("initialize"));
        assert!(!SessionState::New.accepts("tools/list"));
        assert!(!SessionState::Initializing.accepts("tools/list"));
        assert!(SessionState::Ready.accepts("tools/list"));
    }

    #[test]
    fn lifecycle_transitions_in_order() {
        let session = Session::new(ServerCapabilities::default());
        assert_eq!(session.state(), SessionState::New);
        session.begin_initializing();
        assert_eq!(session.state(), SessionState::Initializing);
        assert!(session.mark_ready());
        assert_eq!(session.state(), SessionState::Ready);
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn mark_ready_from_wrong_state_fails() {
        let session = Session::new(ServerCapabilities::default());
        assert!(!session.mark_ready());
    }
}
