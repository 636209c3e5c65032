use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

use crate::models::{EmailMessage, NotificationError, NotificationOutcome};

/// Relay route that accepts `{to, subject, text, html}` and sends over SMTP.
pub const EMAIL_RELAY_PATH: &str = "/reminder-email";

/// Outbound transactional email. Implementations must tolerate being called
/// more than once for the same message.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Dispatcher backed by the clinic's HTTP email relay.
pub struct HttpEmailDispatcher {
    client: Client,
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    ok: Option<bool>,
    error: Option<String>,
}

impl HttpEmailDispatcher {
    pub fn new(config: &AppConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build email HTTP client with timeout ({}), using defaults", e);
                Client::new()
            });

        let endpoint = config.is_email_configured().then(|| {
            format!("{}{}", config.email_service_url.trim_end_matches('/'), EMAIL_RELAY_PATH)
        });

        Self { client, endpoint }
    }
}

#[async_trait]
impl NotificationDispatcher for HttpEmailDispatcher {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let endpoint = self.endpoint.as_deref().ok_or(NotificationError::NotConfigured)?;
        debug!("Relaying email '{}' to {}", message.subject, message.to);

        let response = self.client
            .post(endpoint)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let relay: Option<RelayResponse> = serde_json::from_str(&body).ok();

        let accepted = status.is_success()
            && relay.as_ref().and_then(|r| r.ok).unwrap_or(true);

        if !accepted {
            let reason = relay
                .and_then(|r| r.error)
                .unwrap_or(body);
            return Err(NotificationError::Rejected { status: status.as_u16(), message: reason });
        }

        info!("Email '{}' accepted by relay", message.subject);
        Ok(())
    }
}

/// Sends `message` if there is one and folds the result into an outcome.
/// `None` means the recipient has no address on file.
pub async fn deliver(
    dispatcher: &dyn NotificationDispatcher,
    message: Option<EmailMessage>,
) -> NotificationOutcome {
    let Some(message) = message else {
        return NotificationOutcome::no_email();
    };

    let recipient = message.to.clone();
    match dispatcher.send(message).await {
        Ok(()) => NotificationOutcome::Sent,
        Err(e) => {
            warn!("Notification to {} failed: {}", recipient, e);
            NotificationOutcome::Failed { error: e.to_string() }
        }
    }
}
