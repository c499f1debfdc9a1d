use anyhow::Context as _;
use pm100d::{MeterSettings, PowerUnit};
use tracing::{info, instrument};
use utilities::statistics::SampleStats;

use crate::{
    config::{AppConfig, JobMode},
    controllers::{create_meter, create_stage},
    scan::{PowerMeter, ScanOptions, ScanReport, ScanRequest, run_scan},
};

/// Runs the job selected by `config.job.mode`.
pub async fn run(config: &AppConfig) -> anyhow::Result<()> {
    match config.job.mode {
        JobMode::Measure => measure(config).await,
        mode => {
            let request = config
                .scan_request()
                .with_context(|| format!("No scan defined for mode {mode:?}"))?;
            let report = execute_scan(config, &request, &config.scan_options()).await?;
            info!(
                "Scan finished at {:.4} mm after {} steps",
                report.final_mm,
                report.records.len()
            );
            Ok(())
        }
    }
}

/// Opens the devices a request needs, runs the scan and releases them.
#[instrument(skip_all, fields(target_mm = request.target_mm, steps = request.steps))]
pub async fn execute_scan(
    config: &AppConfig,
    request: &ScanRequest,
    options: &ScanOptions,
) -> anyhow::Result<ScanReport> {
    // The meter is opened first so a missing instrument aborts before the stage moves.
    let meter = match request.measurement {
        Some(_) => Some(create_meter(&config.meter).context("Failed to open power meter")?),
        None => None,
    };
    let (stage_executor, stage) =
        create_stage(&config.stage, &config.timing).context("Failed to open stage")?;

    let stage_task = stage_executor.spawn();
    let (meter_task, meter) = match meter {
        Some((executor, sender)) => (Some(executor.spawn()), Some(sender)),
        None => (None, None),
    };

    let result = run_scan(&stage, meter.as_ref(), request, options).await;

    drop(stage);
    drop(meter);
    stage_task.await.context("Stage executor panicked")?;
    if let Some(task) = meter_task {
        task.await.context("Power meter executor panicked")?;
    }

    Ok(result?)
}

/// Reads `job.samples` power readings without touching the stage.
#[instrument(skip_all)]
pub async fn measure(config: &AppConfig) -> anyhow::Result<()> {
    let (executor, meter) = create_meter(&config.meter).context("Failed to open power meter")?;
    let task = executor.spawn();

    let result = async {
        let idn = meter.identify().await?;
        info!("Connected to: {}", idn.trim());
        meter.beep().await?;

        meter
            .configure(MeterSettings {
                unit: PowerUnit::MilliWatt,
                auto_range: config.meter.auto_range,
                average_count: config.meter.average_count,
                wavelength_nm: config.job.wavelength_nm,
            })
            .await?;

        let readings = meter.read_batch(config.job.samples).await?;
        for (i, reading) in readings.iter().enumerate() {
            info!("Measurement {}: {:.2} mW", i + 1, reading);
        }

        let stats = SampleStats::from_samples(&readings)?;
        info!(
            "Average power: {:.5} mW ± {:.5} mW",
            stats.mean, stats.std_dev
        );
        anyhow::Ok(stats)
    }
    .await;

    drop(meter);
    task.await.context("Power meter executor panicked")?;

    result.map(|_| ())
}
