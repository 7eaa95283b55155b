use crate::constants::CHANGE_CHANNEL_CAPACITY;
use std::fmt;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// "Something changed, re-read the snapshot." Carries no diff, only which
/// service instance emitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub source: Uuid,
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"source\":\"{}\"}}", self.source)
    }
}

/// Per-instance broadcast of [`ChangeEvent`]s.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    source: Uuid,
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            source: Uuid::new_v4(),
            sender,
        }
    }

    pub fn source(&self) -> Uuid {
        self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn notify(&self) {
        let event = ChangeEvent {
            source: self.source,
        };
        // no subscribers is fine
        if self.sender.send(event).is_err() {
            trace!("Change event from {} had no subscribers", self.source);
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
