//! # Notification Senders
//!
//! ```text
//! EventDispatcher ──► dyn NotificationSender
//!                          │
//!                          ├── WhatsAppSender   POST {api_url}
//!                          │                    Authorization: Bearer {token}
//!                          │                    {"target": "628…", "message": "…"}
//!                          │
//!                          └── RecordingSender  keeps messages in memory
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::WhatsAppSettings;
use crate::error::{NotifyError, NotifyResult};

/// Delivers one text message to one recipient.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// `target` is a normalized phone number (`628…`).
    async fn send(&self, target: &str, message: &str) -> NotifyResult<()>;

    fn name(&self) -> &'static str;
}

// =============================================================================
// WhatsApp Gateway
// =============================================================================

#[derive(Debug, Serialize)]
struct GatewayMessage<'a> {
    target: &'a str,
    message: &'a str,
}

/// Sends through a WhatsApp HTTP gateway.
#[derive(Debug, Clone)]
pub struct WhatsAppSender {
    client: Client,
    api_url: String,
    api_token: String,
}

impl WhatsAppSender {
    pub fn new(settings: &WhatsAppSettings) -> NotifyResult<Self> {
        if settings.api_url.is_empty() {
            return Err(NotifyError::InvalidConfig("api_url is empty".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(WhatsAppSender {
            client,
            api_url: settings.api_url.clone(),
            api_token: settings.api_token.clone(),
        })
    }
}

#[async_trait]
impl NotificationSender for WhatsAppSender {
    async fn send(&self, target: &str, message: &str) -> NotifyResult<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&GatewayMessage { target, message })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), target = %target, "Gateway rejected message");
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(target = %target, "Message delivered to gateway");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "whatsapp"
    }
}

// =============================================================================
// Recording Sender
// =============================================================================

/// Keeps sent messages in memory; used in tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<(String, String)>>,
    fail_with: Option<u16>,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sender whose every call fails with a gateway `status`.
    pub fn failing(status: u16) -> Self {
        RecordingSender {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(status),
        }
    }

    /// `(target, message)` pairs in send order.
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl NotificationSender for RecordingSender {
    async fn send(&self, target: &str, message: &str) -> NotifyResult<()> {
        if let Some(status) = self.fail_with {
            return Err(NotifyError::Rejected {
                status,
                body: "recording sender configured to fail".into(),
            });
        }
        self.sent.lock().await.push((target.to_string(), message.to_string()));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
