//! Cooperative cancellation shared by every long-running handler.
//!
//! A `CancellationToken` fires when the transport closes, when a
//! `notifications/cancelled` referencing the associated request arrives, or
//! when an explicit shutdown is requested. It is cloned cheaply and checked
//! (or awaited) from inside tool/prompt/resource/completion handlers and from
//! nested outbound requests such as elicitation, so cancellation propagates
//! down the whole call tree.

use std::sync::Arc;

use tokio::sync::Notify;

/// A cooperative, multi-consumer cancellation signal.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    notify: Notify,
    cancelled: std::sync::atomic::AtomicBool,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                notify: Notify::new(),
                cancelled: std::sync::atomic::AtomicBool::new(false),
            }),
        }
    }

    /// Derive a child token: cancelling the parent cancels the child, but not
    /// vice versa. Used to scope a nested outbound request's lifetime to its
    /// parent tool invocation without letting the nested request cancel
    /// anything above it.
    pub fn child(&self) -> Self {
        let child = Self::new();
        let parent = self.clone();
        let child_inner = child.clone();
        tokio::spawn(async move {
            parent.cancelled().await;
            child_inner.cancel();
        });
        child
    }

    /// Signal cancellation to every clone of this token and every waiter.
    pub fn cancel(&self) {
        self.inner
            .cancelled
            .store(true, std::sync::atomic::Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// True if [`Self::cancel`] has been called on this token or an ancestor.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Resolve once this token is cancelled. A no-op immediately if already
    /// cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.inner.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        token.cancel();
        handle.await.unwrap();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn child_inherits_parent_cancellation() {
        let parent = CancellationToken::new();
        let child = parent.child();
        assert!(!child.is_cancelled());
        parent.cancel();
        child.cancelled().await;
        assert!(child.is_cancelled());
    }
}
