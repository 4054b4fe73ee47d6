//! Error taxonomy shared across the workspace.
//!
//! [`ErrorKind`] mirrors the JSON-RPC error taxonomy: each variant maps to
//! exactly one wire error code via [`ErrorKind::code`].

use std::fmt;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The taxonomy of failures the protocol core can produce.
///
/// Every variant has a well-defined JSON-RPC wire code (see [`ErrorKind::code`])
/// except [`ErrorKind::EntityNotFound`], which callers map onto a domain-specific
/// code or fold into [`ErrorKind::InvalidParams`] as appropriate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    /// Malformed JSON, unparseable as a JSON-RPC envelope.
    #[error("parse error")]
    ParseError,
    /// Well-formed JSON that is not a valid JSON-RPC envelope.
    #[error("invalid request")]
    InvalidRequest,
    /// No handler registered for the method name.
    #[error("method not found: {0}")]
    MethodNotFound(String),
    /// Handler found but arguments failed to bind or validate.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// Handler ran and raised an unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
    /// Inbound traffic arrived before the session reached `Ready`.
    #[error("server not initialized")]
    NotInitialized,
    /// A named entity (tool, prompt, resource, completion binding) was missing.
    #[error("not found: {0}")]
    EntityNotFound(String),
    /// The transport's read/write half failed or hit unexpected EOF.
    #[error("transport closed")]
    TransportClosed,
    /// A pending request's deadline elapsed before a response arrived.
    #[error("timed out")]
    Timeout,
    /// A pending request was cancelled by the peer or by the caller.
    #[error("cancelled")]
    Cancelled,
    /// Bearer token missing, malformed, or failed validation.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
}

impl ErrorKind {
    /// The JSON-RPC 2.0 error code this kind surfaces as on the wire.
    ///
    /// `EntityNotFound` has no single correct code; callers typically fold it
    /// into `-32602` (as this default does) or a server-defined domain code.
    pub fn code(&self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) | Self::EntityNotFound(_) => -32602,
            Self::Internal(_) => -32603,
            Self::NotInitialized => -32002,
            // Not wire codes: these never reach a JSON-RPC error object directly,
            // they resolve a pending-request awaiter instead (see turbomcp-core::cancellation
            // and the correlator in turbomcp-client).
            Self::TransportClosed | Self::Timeout | Self::Cancelled => -32603,
            Self::AuthenticationFailed(_) => -32000,
        }
    }
}

/// The error type returned by every fallible operation in this workspace.
///
/// Carries a [`ErrorKind`] plus an optional source error for diagnostics; the
/// source is never serialized onto the wire, only `kind` and `message` are.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl Error {
    /// Build an error of the given kind with no further context.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Attach a source error for diagnostics (not serialized onto the wire).
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// The error's kind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The JSON-RPC error code for this error.
    pub fn code(&self) -> i64 {
        self.kind.code()
    }

    /// Construct a `MethodNotFound` error.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotFound(method.into()))
    }

    /// Construct an `InvalidParams` error.
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParams(message.into()))
    }

    /// Construct an `Internal` error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }

    /// Construct an `EntityNotFound` error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(ErrorKind::EntityNotFound(what.into()))
    }

    /// Construct an `AuthenticationFailed` error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthenticationFailed(message.into()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        // The boxed source is not Clone; preserve the kind and drop diagnostics.
        Self {
            kind: self.kind.clone(),
            source: None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::ParseError).with_source(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorKind::TransportClosed).with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_spec_table() {
        assert_eq!(ErrorKind::ParseError.code(), -32700);
        assert_eq!(ErrorKind::InvalidRequest.code(), -32600);
        assert_eq!(ErrorKind::MethodNotFound(String::new()).code(), -32601);
        assert_eq!(ErrorKind::InvalidParams(String::new()).code(), -32602);
        assert_eq!(ErrorKind::Internal(String::new()).code(), -32603);
        assert_eq!(ErrorKind::NotInitialized.code(), -32002);
    }

    #[test]
    fn clone_drops_source_but_keeps_kind() {
        let err = Error::internal("boom").with_source(std::io::Error::other("io"));
        let cloned = err.clone();
        assert_eq!(cloned.kind(), err.kind());
        assert!(std::error::Error::source(&cloned).is_none());
    }
}
