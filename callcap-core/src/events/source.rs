//! Defines the EventSource trait the dispatcher pulls events from.

use async_trait::async_trait;

use super::SignalEvent;
use crate::SourceError;

#[async_trait]
pub trait EventSource: Send {
    /// Waits for the next event. `Ok(None)` means the source disconnected.
    async fn next_event(&mut self) -> Result<Option<SignalEvent>, SourceError>;

    /// Closes the source. Safe to call more than once.
    async fn disconnect(&mut self);
}
