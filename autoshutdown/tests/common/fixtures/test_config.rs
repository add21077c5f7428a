//! Test configuration builder for writing config directories to a temp dir

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use super::test_data::SUBSCRIPTION;

/// Builder for a config directory holding main.toml and optionally secrets.toml
pub struct TestConfigBuilder {
    temp_dir: TempDir,
    main: MainConfigBuilder,
    access_token: Option<String>,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            temp_dir,
            main: MainConfigBuilder::default(),
            access_token: None,
        }
    }

    pub fn with_main_config<F>(mut self, f: F) -> Self
    where
        F: FnOnce(MainConfigBuilder) -> MainConfigBuilder,
    {
        self.main = f(self.main);
        self
    }

    pub fn with_access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn build(self) -> TestConfig {
        let config_dir = self.temp_dir.path().join("config");
        fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        fs::write(config_dir.join("main.toml"), self.main.to_toml())
            .expect("Failed to write main.toml");

        if let Some(token) = self.access_token {
            let secrets = format!("[azure]\naccess_token = \"{}\"\n", token);
            fs::write(config_dir.join("secrets.toml"), secrets)
                .expect("Failed to write secrets.toml");
        }

        TestConfig {
            _temp_dir: self.temp_dir,
            config_dir,
        }
    }
}

impl Default for TestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Written config directory; removed when dropped
pub struct TestConfig {
    _temp_dir: TempDir,
    pub config_dir: PathBuf,
}

impl TestConfig {
    pub fn config_dir_string(&self) -> String {
        self.config_dir.to_string_lossy().to_string()
    }
}

#[derive(Clone)]
pub struct MainConfigBuilder {
    subscription_id: String,
    management_endpoint: Option<String>,
    tag_name: Option<String>,
    simulate: bool,
    max_concurrent_machines: Option<usize>,
    run_timeout_seconds: Option<u64>,
    webhook_url: Option<String>,
}

impl Default for MainConfigBuilder {
    fn default() -> Self {
        Self {
            subscription_id: SUBSCRIPTION.to_string(),
            management_endpoint: None,
            tag_name: None,
            simulate: false,
            max_concurrent_machines: None,
            run_timeout_seconds: None,
            webhook_url: None,
        }
    }
}

impl MainConfigBuilder {
    pub fn subscription_id(mut self, id: &str) -> Self {
        self.subscription_id = id.to_string();
        self
    }

    pub fn management_endpoint(mut self, endpoint: &str) -> Self {
        self.management_endpoint = Some(endpoint.to_string());
        self
    }

    pub fn tag_name(mut self, tag: &str) -> Self {
        self.tag_name = Some(tag.to_string());
        self
    }

    pub fn simulate(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    pub fn max_concurrent_machines(mut self, n: usize) -> Self {
        self.max_concurrent_machines = Some(n);
        self
    }

    pub fn run_timeout_seconds(mut self, seconds: u64) -> Self {
        self.run_timeout_seconds = Some(seconds);
        self
    }

    pub fn webhook_url(mut self, url: &str) -> Self {
        self.webhook_url = Some(url.to_string());
        self
    }

    pub fn to_toml(&self) -> String {
        let mut toml = format!(
            "subscription_id = \"{}\"\nsimulate = {}\n",
            self.subscription_id, self.simulate
        );
        if let Some(endpoint) = &self.management_endpoint {
            toml.push_str(&format!("management_endpoint = \"{}\"\n", endpoint));
        }
        if let Some(tag) = &self.tag_name {
            toml.push_str(&format!("tag_name = \"{}\"\n", tag));
        }
        if let Some(n) = self.max_concurrent_machines {
            toml.push_str(&format!("max_concurrent_machines = {}\n", n));
        }
        if let Some(seconds) = self.run_timeout_seconds {
            toml.push_str(&format!("run_timeout_seconds = {}\n", seconds));
        }
        if let Some(url) = &self.webhook_url {
            toml.push_str(&format!("\n[notifications]\nwebhook_url = \"{}\"\n", url));
        }
        toml
    }
}
