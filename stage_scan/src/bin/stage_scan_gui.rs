use std::path::PathBuf;

use anyhow::Context as _;
use eframe::egui;
use stage_scan::{
    config::{create_default_config, init_config},
    gui::StageScanApp,
    logging,
};

fn main() -> anyhow::Result<()> {
    if std::env::var("CREATE_CONFIG").is_ok_and(|val| val == "1" || val.eq_ignore_ascii_case("true")) {
        create_default_config(None::<PathBuf>)?;
    }

    let (_config_manager, config) = init_config().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Run with CREATE_CONFIG=1 to create a default configuration file.");
        e
    })?;

    let _log_guard = logging::init(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([420.0, 280.0])
            .with_title("Stage scan"),
        ..Default::default()
    };

    tracing::info!("Starting stage scan form");

    eframe::run_native(
        "Stage scan",
        options,
        Box::new(|_cc| Ok(Box::new(StageScanApp::new(config, runtime)))),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {e}"))
}
