/// Recording notifier for tests
///
/// Captures every dispatched notification instead of calling out, and can
/// be told to fail so handlers' soft-failure paths are testable.

use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use std::sync::Mutex;

/// In-memory notifier that records what would have been sent
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts every dispatch
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that fails every dispatch
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Returns the notifications recorded so far
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of notifications recorded
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::RequestFailed("recording notifier set to fail".to_string()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{dispatch, DispatchStatus, NotificationKind};
    use serde_json::json;

    fn sample() -> Notification {
        Notification {
            kind: NotificationKind::ReportSubmitted,
            recipient_email: "lead@example.com".to_string(),
            recipient_name: "Team Lead".to_string(),
            variables: json!({"task_title": "Quarterly summary"}),
        }
    }

    #[tokio::test]
    async fn test_records_sent_notifications() {
        let notifier = RecordingNotifier::new();

        let status = dispatch(&notifier, sample()).await;

        assert_eq!(status, DispatchStatus::Sent);
        assert_eq!(notifier.sent_count(), 1);
        assert_eq!(notifier.sent()[0].recipient_email, "lead@example.com");
    }

    #[tokio::test]
    async fn test_failure_is_soft() {
        let notifier = RecordingNotifier::failing();

        let status = dispatch(&notifier, sample()).await;

        assert_eq!(status, DispatchStatus::Error);
        assert_eq!(notifier.sent_count(), 0);
    }
}
