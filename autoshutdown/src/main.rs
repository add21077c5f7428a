use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use autoshutdown::cloud::arm::{AccessToken, ArmClient};
use autoshutdown::constants::defaults;
use autoshutdown::{notify, ConfigManager, ControlPlane, FleetOrchestrator, NotificationSink};

/// Start or deallocate virtual machines according to their schedule tags
#[derive(Debug, Parser)]
#[command(name = "autoshutdown", version, about)]
struct Cli {
    /// Directory holding main.toml and secrets.toml
    #[arg(long, env = "AUTOSHUTDOWN_CONFIG_DIR", default_value = defaults::CONFIG_DIR)]
    config_dir: String,

    /// Log intended actions without issuing them (also enabled by `simulate = true`)
    #[arg(long)]
    simulate: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let env_filter = EnvFilter::from_default_env()
        .add_directive("autoshutdown=info".parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("lettre=warn".parse()?);

    fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    info!("Starting VM auto-shutdown run (config dir: {})", cli.config_dir);

    let config_manager = ConfigManager::new(cli.config_dir.clone()).await?;
    let config = config_manager.get_current_config();
    let simulate = cli.simulate || config.simulate;

    let token = config_manager
        .access_token()
        .context("No access token configured (set AUTOSHUTDOWN_ACCESS_TOKEN or [azure] access_token in secrets.toml)")?;

    let client = Arc::new(ArmClient::new(
        &config.management_endpoint,
        &config.subscription_id,
        AccessToken::new(token),
        config.request_timeout(),
    )?);
    let control_plane = Arc::new(ControlPlane::resource_manager(client));

    let notifier: Arc<dyn NotificationSink> = match notify::from_config(&config.notifications) {
        Ok(notifier) => notifier,
        Err(e) => {
            warn!("Notification setup failed, failures will only be logged: {}", e);
            Arc::new(notify::NoopNotifier)
        }
    };

    let orchestrator = FleetOrchestrator::new(config, control_plane, notifier);

    match orchestrator.run(simulate).await {
        Ok(summary) if summary.stats.errored > 0 => {
            warn!(
                "{} machine(s) could not be reconciled, see errors above",
                summary.stats.errored
            );
            Ok(ExitCode::FAILURE)
        }
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("Auto-shutdown run aborted: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}
