/// Mail transports
///
/// - [`HttpMailer`]: POSTs each message as JSON to a mail relay endpoint
/// - [`LogMailer`]: logs the message instead of sending it, for local runs
///
/// The relay receives:
///
/// ```json
/// {
///   "id": "0b0c...",
///   "from": "no-reply@folio.example",
///   "to": "a@x.com",
///   "subject": "Complete your profile",
///   "text": "Hi Ada, ..."
/// }
/// ```

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::{DeliveryError, Mailer, Notification};

/// Relay connection settings
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// Relay URL the messages are POSTed to
    pub endpoint: String,

    /// Sent as a bearer token when present
    pub api_key: Option<String>,

    /// Sender address
    pub from: String,

    /// Per-attempt request timeout
    pub timeout: Duration,
}

impl MailerConfig {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            from: from.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct OutboundMessage<'a> {
    id: Uuid,
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Mailer backed by an HTTP mail relay
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    config: MailerConfig,
}

impl HttpMailer {
    pub fn new(config: MailerConfig) -> Result<Self, DeliveryError> {
        if config.endpoint.is_empty() {
            return Err(DeliveryError::Configuration("Mail endpoint is empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                DeliveryError::Configuration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let message = OutboundMessage {
            id: notification.id,
            from: &self.config.from,
            to: &notification.recipient,
            subject: &notification.subject,
            text: &notification.body,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&message);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected(format!("{} {}", status.as_u16(), body)));
        }

        debug!(
            to = %notification.recipient,
            status = status.as_u16(),
            "Mail relay accepted message"
        );
        Ok(())
    }
}

/// Mailer that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, notification: &Notification) -> Result<(), DeliveryError> {
        info!(
            to = %notification.recipient,
            subject = %notification.subject,
            kind = ?notification.kind,
            "[LOG MAILER] Email would be sent"
        );
        Ok(())
    }
}
