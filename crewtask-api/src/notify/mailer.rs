/// HTTP mail service client
///
/// Posts notifications as JSON to the configured mail-dispatch service.
/// The reqwest client carries a bounded timeout so a hanging mail service
/// cannot stall a request handler past the configured limit.

use super::{Notification, Notifier, NotifyError};
use crate::config::MailConfig;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Production notifier over an HTTP mail service
///
/// Constructed once in `main` and shared via `AppState`. When no service
/// URL is configured, every send fails softly (dispatch reports "error"
/// after logging) rather than erroring at startup, so local development
/// works without a mail service.
pub struct MailNotifier {
    client: reqwest::Client,
    url: Option<String>,
    token: Option<String>,
}

/// Mail service response body
#[derive(Debug, Deserialize)]
struct MailServiceResponse {
    status: String,
    #[serde(default)]
    error: Option<String>,
}

impl MailNotifier {
    /// Builds a notifier from mail configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &MailConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Notifier for MailNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        let url = self
            .url
            .as_ref()
            .ok_or_else(|| NotifyError::RequestFailed("mail service not configured".to_string()))?;

        let mut request = self
            .client
            .post(format!("{}/send", url.trim_end_matches('/')))
            .json(&serde_json::json!({
                "template": notification.kind.as_str(),
                "recipient": {
                    "email": notification.recipient_email,
                    "name": notification.recipient_name,
                },
                "variables": notification.variables,
            }));

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::RequestFailed(format!(
                "mail service returned {}",
                response.status()
            )));
        }

        let body: MailServiceResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::RequestFailed(e.to_string()))?;

        if body.status != "ok" {
            return Err(NotifyError::Rejected(
                body.error.unwrap_or_else(|| body.status.clone()),
            ));
        }

        Ok(())
    }
}
