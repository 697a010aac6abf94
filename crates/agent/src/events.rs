//! Events yielded by an agent run.
//!
//! The host consumes these from the run's event channel:
//! - **Status**: ephemeral progress text, superseded by later Status
//!   events (edit-in-place if the host supports it).
//! - **Confirmation**: the run is suspended on a destructive operation;
//!   the host must resolve the request before the run proceeds.
//! - **Final**: the terminal reply. Exactly one per run, always last.

use crate::confirm::ConfirmationRequest;
use tokio::sync::mpsc;

/// The closed set of events a run can yield.
#[derive(Debug, Clone)]
pub enum LoopEvent {
    /// Ephemeral progress text.
    Status { text: String },

    /// A destructive operation awaits an approve/reject decision.
    Confirmation(ConfirmationRequest),

    /// The terminal reply. Ends the event sequence.
    Final { text: String },
}

impl LoopEvent {
    /// Short tag for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Confirmation(_) => "confirmation",
            Self::Final { .. } => "final",
        }
    }

    /// Whether this event terminates the run.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Final { .. })
    }
}

/// The host dropped its event receiver; the run must stop.
#[derive(Debug)]
pub(crate) struct ConsumerGone;

/// Yield one event and suspend until the host has taken it.
///
/// The run's channel has capacity 1, so reserving a slot right after
/// the send resolves only once the host has received the event, and
/// fails once the receiver is gone. The producer therefore never runs
/// more than the in-flight event ahead of the host.
pub(crate) async fn deliver(
    tx: &mpsc::Sender<LoopEvent>,
    event: LoopEvent,
) -> Result<(), ConsumerGone> {
    tx.send(event).await.map_err(|_| ConsumerGone)?;
    match tx.reserve().await {
        Ok(permit) => {
            drop(permit);
            Ok(())
        }
        Err(_) => Err(ConsumerGone),
    }
}
