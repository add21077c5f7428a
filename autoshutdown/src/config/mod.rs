pub mod manager;
pub mod secrets;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use manager::ConfigManager;
pub use secrets::SecretsLoader;

use crate::constants::{defaults, tags};
use crate::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub subscription_id: String,
    #[serde(default = "default_management_endpoint")]
    pub management_endpoint: String,
    #[serde(default = "default_tag_name")]
    pub tag_name: String,
    #[serde(default)]
    pub simulate: bool,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,
    #[serde(default = "default_max_concurrent_machines")]
    pub max_concurrent_machines: usize,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhook_url: Option<String>,
    pub email: Option<EmailConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub from: String,
    pub to: Vec<String>,
}

fn default_management_endpoint() -> String {
    defaults::MANAGEMENT_ENDPOINT.to_string()
}

fn default_tag_name() -> String {
    tags::SCHEDULE_TAG.to_string()
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECONDS
}

fn default_run_timeout() -> u64 {
    defaults::RUN_TIMEOUT_SECONDS
}

fn default_max_concurrent_machines() -> usize {
    defaults::MAX_CONCURRENT_MACHINES
}

fn default_smtp_port() -> u16 {
    defaults::SMTP_PORT
}

impl Config {
    /// Config for a subscription with every other field at its default
    pub fn for_subscription(subscription_id: &str) -> Self {
        Self {
            subscription_id: subscription_id.to_string(),
            management_endpoint: default_management_endpoint(),
            tag_name: default_tag_name(),
            simulate: false,
            request_timeout_seconds: default_request_timeout(),
            run_timeout_seconds: default_run_timeout(),
            max_concurrent_machines: default_max_concurrent_machines(),
            notifications: NotificationConfig::default(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subscription_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "subscription_id".to_string(),
            });
        }
        if self.tag_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "tag_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !self.management_endpoint.starts_with("http://")
            && !self.management_endpoint.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "management_endpoint".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.management_endpoint),
            });
        }
        for (field, value) in [
            ("request_timeout_seconds", self.request_timeout_seconds),
            ("run_timeout_seconds", self.run_timeout_seconds),
            ("max_concurrent_machines", self.max_concurrent_machines as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        if let Some(email) = &self.notifications.email {
            if email.to.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "notifications.email.to".to_string(),
                    reason: "at least one recipient is required".to_string(),
                });
            }
        }
        Ok(())
    }
}
