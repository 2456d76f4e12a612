//! Mock collaborators.

use scriptorium::events::{Event, Notifier, NotifyError};
use std::sync::Mutex;
use uuid::Uuid;

/// Notifier remembering every notification sent.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Uuid, Event)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications sent so far, oldest first.
    pub fn sent(&self) -> Vec<(Uuid, Event)> {
        self.sent.lock().unwrap().clone()
    }

    /// Notifications sent to a user, oldest first.
    pub fn sent_to(&self, user: Uuid) -> Vec<Event> {
        self.sent()
            .into_iter()
            .filter(|&(to, _)| to == user)
            .map(|(_, event)| event)
            .collect()
    }

    /// Forget all notifications sent so far.
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, user: Uuid, event: Event) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push((user, event));
        Ok(())
    }
}

/// Notifier which can't deliver anything.
pub struct FailingNotifier;

impl Notifier for FailingNotifier {
    fn send(&self, _: Uuid, _: Event) -> Result<(), NotifyError> {
        Err(NotifyError::Dispatch("notifier unavailable".to_string()))
    }
}
