//! State shared by the inbound handlers.

use tokio::sync::mpsc;

/// A change notification for one record, as handed to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEvent {
    pub record_id: String,
}

/// Shared handler state. Cloning is cheap: only the queue sender is held.
#[derive(Clone)]
pub struct WebhookState {
    pub events: mpsc::Sender<RecordEvent>,
}

impl WebhookState {
    /// Create the state together with the receiving end of the event queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RecordEvent>) {
        let (events, rx) = mpsc::channel(capacity.max(1));
        (Self { events }, rx)
    }
}
