use std::path::PathBuf;

use stage_scan::{
    config::{create_default_config, init_config},
    jobs, logging,
};
use tracing::info;

fn should_create_config() -> bool {
    std::env::var("CREATE_CONFIG")
        .map(|val| val == "1" || val.to_lowercase() == "true")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if should_create_config() {
        create_default_config(None::<PathBuf>)?;
    }

    let (config_manager, config) = init_config().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Run with CREATE_CONFIG=1 to create a default configuration file.");
        e
    })?;

    let _log_guard = logging::init(&config.logging)?;
    info!(
        config = %config_manager.path().display(),
        mode = ?config.job.mode,
        "Starting stage scan"
    );

    jobs::run(&config).await
}
