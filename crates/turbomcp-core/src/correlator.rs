//! The pending-request correlator, shared by both peers: the client uses
//! one for ordinary outbound RPCs, the server uses one for
//! server-originated requests such as `elicitation/create`.
//!
//! `send` (conceptually — callers write the frame themselves and then call
//! [`Correlator::register`]) allocates an awaiter keyed by id; whichever of
//! [`Correlator::resolve`], [`Correlator::cancel`], [`Correlator::fail_timeout`]
//! or [`Correlator::close_all`] happens first wins. An awaiter is never left
//! unresolved: every registered id eventually produces exactly one outcome.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::time::timeout;

use crate::{ErrorKind, RequestId, Error};

/// Why a pending request resolved without an ordinary response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// A matching response arrived.
    Response(T),
    /// The local transport closed before a response arrived.
    TransportClosed,
    /// A deadline elapsed before a response arrived.
    Timeout,
    /// A `notifications/cancelled` referencing this id arrived.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Convert to a `Result`, turning every non-response outcome into the
    /// matching [`ErrorKind`].
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Self::Response(value) => Ok(value),
            Self::TransportClosed => Err(Error::new(ErrorKind::TransportClosed)),
            Self::Timeout => Err(Error::new(ErrorKind::Timeout)),
            Self::Cancelled => Err(Error::new(ErrorKind::Cancelled)),
        }
    }
}

/// A thread-safe `id -> awaiter` table. Generic over the resolved payload
/// type so both the client (resolves with a parsed `JsonRpcResponse`) and
/// the server (resolves with a typed elicitation result) can share it.
pub struct Correlator<T> {
    pending: Arc<DashMap<RequestId, oneshot::Sender<Outcome<T>>>>,
}

impl<T> Default for Correlator<T> {
    fn default() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
        }
    }
}

impl<T> Clone for Correlator<T> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
        }
    }
}

impl<T> Correlator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh awaiter for `id`. Returns a future that resolves to
    /// the eventual [`Outcome`]; `deadline`, if given, also races a timeout.
    pub fn register(
        &self,
        id: RequestId,
        deadline: Option<Duration>,
    ) -> impl std::future::Future<Output = Outcome<T>> {
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);
        let pending = self.pending.clone();
        async move {
            let result = match deadline {
                Some(d) => match timeout(d, rx).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(_)) => Outcome::TransportClosed,
                    Err(_) => {
                        pending.remove(&id);
                        Outcome::Timeout
                    }
                },
                None => rx.await.unwrap_or(Outcome::TransportClosed),
            };
            result
        }
    }

    /// Deliver a response to its awaiter. Logs and drops if no matching
    /// awaiter is registered (already resolved, or an unsolicited reply) —
    /// this is a warning, not an error.
    pub fn resolve(&self, id: &RequestId, value: T) {
        if let Some((_, tx)) = self.pending.remove(id) {
            let _ = tx.send(Outcome::Response(value));
        } else {
            tracing::warn!(%id, "response for unknown or already-resolved request id");
        }
    }

    /// Resolve one awaiter with `Cancelled` (a `notifications/cancelled` for
    /// this id arrived).
    pub fn cancel(&self, id: &RequestId) {
        if let Some((_, tx)) = self.pending.remove(id) {
            let _ = tx.send(Outcome::Cancelled);
        }
    }

    /// Drain every outstanding awaiter with `TransportClosed`. Called when
    /// the session transitions to `Closed`.
    pub fn close_all(&self) {
        let ids: Vec<RequestId> = self.pending.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Outcome::TransportClosed);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_response() {
        let correlator: Correlator<u32> = Correlator::new();
        let id = RequestId::number(1);
        let waiter = correlator.register(id.clone(), None);
        correlator.resolve(&id, 42);
        assert_eq!(waiter.await, Outcome::Response(42));
    }

    #[tokio::test]
    async fn close_all_resolves_every_pending_awaiter() {
        let correlator: Correlator<u32> = Correlator::new();
        let a = correlator.register(RequestId::number(1), None);
        let b = correlator.register(RequestId::number(2), None);
        correlator.close_all();
        assert_eq!(a.await, Outcome::TransportClosed);
        assert_eq!(b.await, Outcome::TransportClosed);
    }

    #[tokio::test]
    async fn cancel_resolves_with_cancelled() {
        let correlator: Correlator<u32> = Correlator::new();
        let id = RequestId::number(5);
        let waiter = correlator.register(id.clone(), None);
        correlator.cancel(&id);
        assert_eq!(waiter.await, Outcome::Cancelled);
    }

    #[tokio::test]
    async fn timeout_resolves_with_timeout_and_evicts_entry() {
        let correlator: Correlator<u32> = Correlator::new();
        let id = RequestId::number(9);
        let waiter = correlator.register(id.clone(), Some(Duration::from_millis(10)));
        assert_eq!(waiter.await, Outcome::Timeout);
        assert!(correlator.is_empty());
    }

    #[tokio::test]
    async fn unmatched_resolve_is_a_no_op_not_a_panic() {
        let correlator: Correlator<u32> = Correlator::new();
        correlator.resolve(&RequestId::number(404), 1);
    }
}
