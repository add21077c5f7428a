use super::{Config, SecretsLoader};
use crate::constants::env;
use crate::errors::ConfigError;
use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

pub struct ConfigManager {
    current_config: Arc<Config>,
    secrets: SecretsLoader,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        let secrets = SecretsLoader::load(&Path::new(&config_dir).join("secrets.toml"))?;
        Ok(Self {
            current_config: Arc::new(config),
            secrets,
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.secrets.access_token()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path)
            .await
            .map_err(|e| ConfigError::LoadFailed {
                path: main_config_path.clone(),
                reason: e.to_string(),
            })?;

        let mut config: Config = toml::from_str(&main_config_content).map_err(|e| {
            ConfigError::ParseError {
                reason: e.to_string(),
            }
        })?;

        apply_env_overrides(&mut config)?;
        config.validate()?;

        info!(
            "Configuration loaded: subscription {}, tag '{}', simulate {}, concurrency {}",
            config.subscription_id,
            config.tag_name,
            config.simulate,
            config.max_concurrent_machines
        );

        Ok(config)
    }
}

/// `AUTOSHUTDOWN_SUBSCRIPTION_ID` and `AUTOSHUTDOWN_SIMULATE` win over main.toml
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(subscription_id) = std::env::var(env::SUBSCRIPTION_ID) {
        if !subscription_id.trim().is_empty() {
            debug!("Subscription id overridden from {}", env::SUBSCRIPTION_ID);
            config.subscription_id = subscription_id.trim().to_string();
        }
    }

    if let Ok(raw) = std::env::var(env::SIMULATE) {
        config.simulate = parse_bool(&raw).ok_or_else(|| {
            anyhow!(ConfigError::InvalidValue {
                field: env::SIMULATE.to_string(),
                reason: format!("'{}' is not a boolean", raw),
            })
        })?;
        debug!("Simulate overridden from {}: {}", env::SIMULATE, config.simulate);
    }

    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
