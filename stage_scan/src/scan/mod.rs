#![allow(async_fn_in_trait)]

use std::{error::Error, io, path::PathBuf, time::Duration};

use pm100d::{MeterSettings, PowerUnit};
use tracing::{info, warn};
use utilities::{
    motor_controller::{LinearStage, SettleError, SettleParams, wait_until_settled},
    statistics::{SampleStats, StatsError},
};

use crate::record::RecordWriter;

pub mod plan;

pub use plan::{Direction, PlanError, StepPlan};

type BoxError = Box<dyn Error + Send + Sync>;

/// Power meter as seen by the scan.
pub trait PowerMeter {
    type Error: Error + Send + Sync + 'static;

    async fn configure(&self, settings: MeterSettings) -> Result<(), Self::Error>;
    async fn read_batch(&self, count: usize) -> Result<Vec<f64>, Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRequest {
    pub wavelength_nm: f64,
    pub samples: usize,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub target_mm: f64,
    pub steps: u32,
    pub direction: Option<Direction>,
    pub measurement: Option<MeasurementRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanOptions {
    pub settle: SettleParams,
    pub tolerance_mm: f64,
    pub enforce_tolerance: bool,
    pub average_count: u32,
    pub auto_range: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            settle: SettleParams::default(),
            tolerance_mm: 0.1,
            enforce_tolerance: false,
            average_count: 50,
            auto_range: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: u32,
    pub position_mm: f64,
    pub power: Option<SampleStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub start_mm: f64,
    pub target_mm: f64,
    pub final_mm: f64,
    pub reached: bool,
    pub records: Vec<StepRecord>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("Stage error: {0}")]
    Stage(#[source] BoxError),

    #[error(
        "Stage did not settle at {target:.4} mm within {time_limit:?} (last position {last_position:.4} mm)"
    )]
    SettleTimeout {
        target: f64,
        last_position: f64,
        time_limit: Duration,
    },

    #[error("Stage stopped on a limit switch at {position:.4} mm before reaching {target:.4} mm")]
    LimitSwitch { target: f64, position: f64 },

    #[error("Power meter error: {0}")]
    Meter(#[source] BoxError),

    #[error("A power measurement was requested but no power meter is attached")]
    MeterMissing,

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Failed to write scan record '{path}': {source}")]
    Record { path: PathBuf, source: io::Error },

    #[error(
        "Stage finished at {final_mm:.4} mm, {distance:.4} mm from the target {target_mm:.4} mm (tolerance {tolerance_mm} mm)"
    )]
    ToleranceMissed {
        target_mm: f64,
        final_mm: f64,
        distance: f64,
        tolerance_mm: f64,
    },
}

impl<E: Error + Send + Sync + 'static> From<SettleError<E>> for ScanError {
    fn from(error: SettleError<E>) -> Self {
        match error {
            SettleError::Stage(e) => ScanError::Stage(Box::new(e)),
            SettleError::Timeout {
                target,
                last_position,
                time_limit,
            } => ScanError::SettleTimeout {
                target,
                last_position,
                time_limit,
            },
            SettleError::LimitSwitch { target, position } => {
                ScanError::LimitSwitch { target, position }
            }
        }
    }
}

fn stage_error(e: impl Error + Send + Sync + 'static) -> ScanError {
    ScanError::Stage(Box::new(e))
}

fn meter_error(e: impl Error + Send + Sync + 'static) -> ScanError {
    ScanError::Meter(Box::new(e))
}

struct Measurement<'a, M> {
    meter: &'a M,
    samples: usize,
    writer: RecordWriter<io::BufWriter<std::fs::File>>,
    path: PathBuf,
}

/// Moves the stage to `request.target_mm` in `request.steps` equal steps,
/// optionally measuring and logging optical power after every step.
///
/// The loop is bounded by the step count; a step that does not settle aborts
/// the scan. The final tolerance check only fails the scan when
/// `options.enforce_tolerance` is set.
pub async fn run_scan<S: LinearStage, M: PowerMeter>(
    stage: &S,
    meter: Option<&M>,
    request: &ScanRequest,
    options: &ScanOptions,
) -> Result<ScanReport, ScanError> {
    let start_mm = stage.position().await.map_err(stage_error)?;
    info!("Current position: {start_mm} mm");

    let plan = StepPlan::new(start_mm, request.target_mm, request.steps, request.direction)?;
    info!(
        start_mm = plan.start(),
        target_mm = plan.target(),
        step_mm = plan.step_size(),
        steps = plan.steps(),
        "Scan planned"
    );
    if plan.moves_away_from_target() {
        warn!(
            direction = %request.direction.unwrap_or_default(),
            target_mm = request.target_mm,
            "Direction points away from the target, the stage will end at {:.4} mm",
            plan.final_target()
        );
    }

    let mut measurement = match (&request.measurement, meter) {
        (Some(measure), Some(meter)) => {
            let settings = MeterSettings {
                unit: PowerUnit::MilliWatt,
                auto_range: options.auto_range,
                average_count: options.average_count,
                wavelength_nm: measure.wavelength_nm,
            };
            meter.configure(settings).await.map_err(meter_error)?;

            let writer =
                RecordWriter::create(&measure.output).map_err(|source| ScanError::Record {
                    path: measure.output.clone(),
                    source,
                })?;

            Some(Measurement {
                meter,
                samples: measure.samples,
                writer,
                path: measure.output.clone(),
            })
        }
        (Some(_), None) => return Err(ScanError::MeterMissing),
        (None, _) => None,
    };

    let mut records = Vec::new();
    let mut final_mm = start_mm;

    for (step, target) in plan.targets() {
        let device_units = stage.to_device_units(target).await.map_err(stage_error)?;
        info!("Step {step}: moving to {target} mm ({device_units} device units)");

        stage.start_move(device_units).await.map_err(stage_error)?;
        let position_mm = wait_until_settled(stage, target, &options.settle).await?;
        info!("Position after step {step}: {position_mm} mm");

        let power = match measurement.as_mut() {
            Some(m) => {
                let readings = m.meter.read_batch(m.samples).await.map_err(meter_error)?;
                let stats = SampleStats::from_samples(&readings)?;
                info!(
                    "Measured power: {:.5} ± {:.5} mW",
                    stats.mean, stats.std_dev
                );

                m.writer
                    .append(step, position_mm, &stats)
                    .map_err(|source| ScanError::Record {
                        path: m.path.clone(),
                        source,
                    })?;
                Some(stats)
            }
            None => None,
        };

        records.push(StepRecord {
            step,
            position_mm,
            power,
        });
        final_mm = position_mm;
    }

    let distance = (final_mm - request.target_mm).abs();
    let reached = distance < options.tolerance_mm;

    if reached {
        info!("The stage has reached the target position.");
    } else {
        warn!(
            "The stage has not reached the target position ({distance:.4} mm away, tolerance {} mm).",
            options.tolerance_mm
        );
        if options.enforce_tolerance {
            return Err(ScanError::ToleranceMissed {
                target_mm: request.target_mm,
                final_mm,
                distance,
                tolerance_mm: options.tolerance_mm,
            });
        }
    }

    Ok(ScanReport {
        start_mm,
        target_mm: request.target_mm,
        final_mm,
        reached,
        records,
    })
}
