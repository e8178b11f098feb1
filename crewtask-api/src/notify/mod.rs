/// Notification dispatch
///
/// Email notifications are fired after the database transaction commits and
/// are strictly best-effort: a failed dispatch is logged and surfaced as a
/// soft `"notification": "error"` field in the response, never as a failed
/// request.
///
/// The [`Notifier`] trait is the seam between the business logic and the
/// mail-dispatch service. The production implementation
/// ([`mailer::MailNotifier`]) posts to an HTTP mail service with a bounded
/// timeout; tests use [`mock::RecordingNotifier`].

pub mod mailer;
pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Notification template kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A task was assigned to the recipient
    TaskAssigned,

    /// A completion report awaits the recipient's review
    ReportSubmitted,

    /// The recipient's report was approved or rejected
    ReportReviewed,

    /// A leadership report awaits the recipient's review
    LeadershipReportSubmitted,

    /// The recipient's leadership report was reviewed
    LeadershipReportReviewed,
}

impl NotificationKind {
    /// Template identifier sent to the mail service
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::TaskAssigned => "task_assigned",
            NotificationKind::ReportSubmitted => "report_submitted",
            NotificationKind::ReportReviewed => "report_reviewed",
            NotificationKind::LeadershipReportSubmitted => "leadership_report_submitted",
            NotificationKind::LeadershipReportReviewed => "leadership_report_reviewed",
        }
    }
}

/// A notification to dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Template kind
    pub kind: NotificationKind,

    /// Recipient email address
    pub recipient_email: String,

    /// Recipient display name
    pub recipient_name: String,

    /// Template variables (task title, reviewer name, ...)
    pub variables: JsonValue,
}

/// Error type for notification dispatch
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The mail service call failed (network, timeout, non-2xx)
    #[error("Mail service request failed: {0}")]
    RequestFailed(String),

    /// The mail service rejected the notification
    #[error("Mail service rejected notification: {0}")]
    Rejected(String),
}

/// Dispatch outcome surfaced in API responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Dispatched successfully
    Sent,

    /// No notification was needed (e.g. self-review, no reviewer resolved)
    Skipped,

    /// Dispatch failed; the primary operation still succeeded
    Error,
}

impl DispatchStatus {
    /// Response payload string
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Sent => "sent",
            DispatchStatus::Skipped => "skipped",
            DispatchStatus::Error => "error",
        }
    }
}

/// Outbound notification seam
///
/// Implementations are constructed once at startup and shared through the
/// application state; there is no process-wide client.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Dispatches a single notification
    async fn send(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Sends a notification and folds the outcome into a [`DispatchStatus`]
///
/// Failures are logged here; callers only place the status string in the
/// response payload.
pub async fn dispatch(notifier: &dyn Notifier, notification: Notification) -> DispatchStatus {
    let kind = notification.kind;
    let recipient = notification.recipient_email.clone();

    match notifier.send(notification).await {
        Ok(()) => DispatchStatus::Sent,
        Err(e) => {
            tracing::warn!(
                kind = kind.as_str(),
                recipient = %recipient,
                error = %e,
                "Notification dispatch failed"
            );
            DispatchStatus::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_strings() {
        assert_eq!(NotificationKind::TaskAssigned.as_str(), "task_assigned");
        assert_eq!(
            NotificationKind::LeadershipReportReviewed.as_str(),
            "leadership_report_reviewed"
        );
    }

    #[test]
    fn test_dispatch_status_strings() {
        assert_eq!(DispatchStatus::Sent.as_str(), "sent");
        assert_eq!(DispatchStatus::Skipped.as_str(), "skipped");
        assert_eq!(DispatchStatus::Error.as_str(), "error");
    }
}
