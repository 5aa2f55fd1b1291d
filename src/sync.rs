use crate::error::AgentError;

/// An action recorded while offline, waiting to be replayed against the
/// server. The payload is opaque to the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: String,
    pub payload: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The event carried a tag this agent does not handle.
    Ignored,
    Empty,
    Synced(usize),
}

/// Durable store of offline actions.
#[allow(async_fn_in_trait)]
pub trait PendingActionQueue {
    async fn pending(&self) -> Result<Vec<PendingAction>, AgentError>;

    async fn clear(&self) -> Result<(), AgentError>;
}

/// Queue with no backing store: always empty.
// TODO: back this with IndexedDB once the favorites endpoint exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyQueue;

impl PendingActionQueue for EmptyQueue {
    async fn pending(&self) -> Result<Vec<PendingAction>, AgentError> {
        Ok(Vec::new())
    }

    async fn clear(&self) -> Result<(), AgentError> {
        Ok(())
    }
}
