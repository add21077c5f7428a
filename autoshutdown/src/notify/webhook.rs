use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use tokio::time::timeout;
use tracing::{info, warn};

use super::{NotificationSink, NotifyError};
use crate::constants::http;

#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
    pub timestamp: DateTime<Utc>,
    pub source: String,
    pub host: String,
    pub message: String,
}

/// Posts failure summaries as JSON to a webhook
#[derive(Clone)]
pub struct WebhookNotifier {
    webhook_url: String,
    host: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(webhook_url: String) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(http::WEBHOOK_TIMEOUT).build()?;
        let host = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
        Ok(Self {
            webhook_url,
            host,
            client,
        })
    }

    async fn send_webhook(&self, payload: &AlertPayload) -> Result<(), NotifyError> {
        let response = match timeout(
            http::WEBHOOK_TIMEOUT,
            self.client.post(&self.webhook_url).json(payload).send(),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Failed to send alert: {}", e);
                return Err(e.into());
            }
            Err(_) => {
                warn!("Alert webhook timeout");
                return Err(NotifyError::Timeout);
            }
        };

        if response.status().is_success() {
            info!("Alert sent successfully to {}", self.webhook_url);
            Ok(())
        } else {
            warn!("Alert webhook returned status: {}", response.status());
            Err(NotifyError::Status(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify_failure(&self, message: &str) -> Result<(), NotifyError> {
        let payload = AlertPayload {
            timestamp: Utc::now(),
            source: env!("CARGO_PKG_NAME").to_string(),
            host: self.host.clone(),
            message: message.to_string(),
        };
        self.send_webhook(&payload).await
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}
