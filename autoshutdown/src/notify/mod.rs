//! Failure notification sinks
//!
//! Delivery is best effort: the orchestrator logs a failed notification and
//! moves on, it never fails a run because an alert could not be sent.

pub mod email;
pub mod webhook;

pub use email::EmailNotifier;
pub use webhook::WebhookNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::NotificationConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    Status(u16),

    #[error("Delivery timed out")]
    Timeout,

    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_failure(&self, message: &str) -> Result<(), NotifyError>;

    /// Human-readable name for this channel (e.g., "webhook", "email")
    fn channel_name(&self) -> &str;
}

/// Sink used when no channel is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl NotificationSink for NoopNotifier {
    async fn notify_failure(&self, message: &str) -> Result<(), NotifyError> {
        debug!("No notification channel configured, dropping: {}", message);
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "noop"
    }
}

/// Delivers to every channel; one failing channel does not block the others
pub struct FanoutNotifier {
    channels: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new(channels: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { channels }
    }
}

#[async_trait]
impl NotificationSink for FanoutNotifier {
    async fn notify_failure(&self, message: &str) -> Result<(), NotifyError> {
        for channel in &self.channels {
            if let Err(e) = channel.notify_failure(message).await {
                warn!("Notification via {} failed: {}", channel.channel_name(), e);
            }
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "fanout"
    }
}

/// Build the sink described by `[notifications]`; no channels yields a no-op sink
pub fn from_config(config: &NotificationConfig) -> Result<Arc<dyn NotificationSink>, NotifyError> {
    let mut channels: Vec<Arc<dyn NotificationSink>> = Vec::new();

    if let Some(url) = config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        channels.push(Arc::new(WebhookNotifier::new(url.to_string())?));
        info!("Failure notifications enabled via webhook");
    }

    if let Some(email) = &config.email {
        channels.push(Arc::new(EmailNotifier::from_config(email)?));
        info!(
            "Failure notifications enabled via email to {} recipient(s)",
            email.to.len()
        );
    }

    if channels.is_empty() {
        warn!("No notification channel configured, failures will only be logged");
        return Ok(Arc::new(NoopNotifier));
    }

    Ok(Arc::new(FanoutNotifier::new(channels)))
}
