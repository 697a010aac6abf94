//! Confirmation gate for destructive operations.
//!
//! Bridges an asynchronous human decision into the otherwise-linear
//! loop. A `ConfirmationRequest` is created pending, handed to the host
//! through the event channel, and resolved exactly once: the approver
//! calls `approve()` or `reject()`, or the loop's deadline forces a
//! rejection. The first writer wins; every later write is a no-op. The
//! loop suspends on `decision()` and observes only the final value.

use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Notify;

/// A single destructive operation awaiting an approve/reject decision.
///
/// Clones share the same underlying decision: resolving any clone
/// resolves them all. Instances are created per operation and never
/// reused.
#[derive(Clone)]
pub struct ConfirmationRequest {
    /// The operation awaiting approval.
    pub tool_name: String,

    /// The arguments the model supplied, for the approver to inspect.
    pub arguments: serde_json::Map<String, serde_json::Value>,

    state: Arc<ConfirmState>,
}

struct ConfirmState {
    /// Single-assignment decision slot. `OnceLock::set` is the
    /// first-writer-wins guarantee.
    decision: OnceLock<bool>,
    notify: Notify,
}

impl ConfirmationRequest {
    pub fn new(
        tool_name: impl Into<String>,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
            state: Arc::new(ConfirmState {
                decision: OnceLock::new(),
                notify: Notify::new(),
            }),
        }
    }

    /// Resolve as approved. Returns false if already resolved.
    pub fn approve(&self) -> bool {
        self.resolve(true)
    }

    /// Resolve as rejected. Returns false if already resolved.
    pub fn reject(&self) -> bool {
        self.resolve(false)
    }

    fn resolve(&self, approved: bool) -> bool {
        let won = self.state.decision.set(approved).is_ok();
        if won {
            self.state.notify.notify_waiters();
        }
        won
    }

    /// The decision so far: `None` while pending.
    pub fn resolved(&self) -> Option<bool> {
        self.state.decision.get().copied()
    }

    /// Suspend until the request is resolved or `timeout` elapses.
    ///
    /// A timeout forces a rejection, resolving the request so any
    /// later approver write is a no-op. A decision that landed in the
    /// same tick as the deadline wins over the forced rejection.
    pub async fn decision(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                // Register for the wakeup before checking state, so a
                // resolution between the check and the await is not lost.
                let notified = self.state.notify.notified();
                if let Some(approved) = self.resolved() {
                    return approved;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(approved) => approved,
            Err(_) => {
                self.resolve(false);
                self.resolved().unwrap_or(false)
            }
        }
    }
}

impl std::fmt::Debug for ConfirmationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationRequest")
            .field("tool_name", &self.tool_name)
            .field("arguments", &self.arguments)
            .field("resolved", &self.resolved())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> ConfirmationRequest {
        ConfirmationRequest::new(name, serde_json::Map::new())
    }

    #[tokio::test]
    async fn approval_resumes_the_waiter() {
        let req = request("ban_user");
        let handle = req.clone();

        let waiter = tokio::spawn(async move { req.decision(Duration::from_secs(60)).await });
        tokio::task::yield_now().await;

        assert!(handle.approve());
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn rejection_resumes_the_waiter() {
        let req = request("purge_messages");
        let handle = req.clone();

        let waiter = tokio::spawn(async move { req.decision(Duration::from_secs(60)).await });
        tokio::task::yield_now().await;

        assert!(handle.reject());
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_forces_rejection() {
        let req = request("delete_channel");
        assert!(!req.decision(Duration::from_secs(60)).await);
        assert_eq!(req.resolved(), Some(false));
    }

    #[tokio::test]
    async fn first_writer_wins_both_orders() {
        let req = request("ban_user");
        assert!(req.approve());
        assert!(!req.reject());
        assert_eq!(req.resolved(), Some(true));

        let req = request("ban_user");
        assert!(req.reject());
        assert!(!req.approve());
        assert_eq!(req.resolved(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn decision_after_timeout_is_a_no_op() {
        let req = request("kick_user");
        let handle = req.clone();

        assert!(!req.decision(Duration::from_secs(60)).await);
        // The approver clicks after the deadline already rejected.
        assert!(!handle.approve());
        assert_eq!(handle.resolved(), Some(false));
    }

    #[tokio::test]
    async fn resolution_before_waiting_is_not_lost() {
        let req = request("ban_user");
        req.approve();
        // The waiter registers after the notify fired; the state check
        // must still observe the decision.
        assert!(req.decision(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn concurrent_resolvers_settle_on_one_value() {
        let req = request("ban_user");
        let a = req.clone();
        let b = req.clone();

        let t1 = tokio::spawn(async move { a.approve() });
        let t2 = tokio::spawn(async move { b.reject() });
        let (won1, won2) = (t1.await.unwrap(), t2.await.unwrap());

        // Exactly one writer wins, and the value matches the winner.
        assert!(won1 ^ won2);
        let value = req.resolved().unwrap();
        assert_eq!(value, won1);
    }
}
