//! Secrets loader for the resource manager access token.
//!
//! The token is kept in a separate TOML file (config/secrets.toml) that should
//! be excluded from version control. `AUTOSHUTDOWN_ACCESS_TOKEN` takes priority
//! over the file, so schedulers that inject credentials through the
//! environment need no file at all.
//!
//! Example secrets.toml:
//! ```toml
//! [azure]
//! access_token = "eyJ0eXAiOi..."
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

use crate::constants::env;

#[derive(Debug, Deserialize, Default)]
pub struct SecretsFile {
    #[serde(default)]
    pub azure: AzureSecrets,
}

#[derive(Deserialize, Default)]
pub struct AzureSecrets {
    pub access_token: Option<String>,
}

impl std::fmt::Debug for AzureSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSecrets")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .finish()
    }
}

pub struct SecretsLoader {
    secrets: SecretsFile,
}

impl SecretsLoader {
    /// Load secrets from the specified file path.
    /// Returns an empty loader if the file doesn't exist.
    pub fn load(secrets_path: &Path) -> Result<Self> {
        if !secrets_path.exists() {
            warn!(
                "Secrets file not found at {:?}, access token must come from {}",
                secrets_path,
                env::ACCESS_TOKEN
            );
            return Ok(Self {
                secrets: SecretsFile::default(),
            });
        }

        let content = std::fs::read_to_string(secrets_path)
            .with_context(|| format!("Failed to read secrets file: {:?}", secrets_path))?;

        let secrets: SecretsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse secrets file: {:?}", secrets_path))?;

        info!("Loaded secrets from {:?}", secrets_path);

        Ok(Self { secrets })
    }

    /// Token from the environment, falling back to the secrets file
    pub fn access_token(&self) -> Option<String> {
        std::env::var(env::ACCESS_TOKEN)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.secrets.azure.access_token.clone())
            .filter(|t| !t.trim().is_empty())
    }
}
