use std::sync::Arc;

use kinesis::{DcServo, KinesisError, KinesisLibrary};
use tracing::info;
use utilities::command_executor::CommandExecutor;

use crate::{
    command_executor::{
        meter::{MeterHandler, command_sender::MeterCommandSender},
        stage::{StageHandler, command_sender::StageCommandSender},
    },
    config::{MeterConfig, StageConfig, TimingConfig},
};

#[cfg(feature = "visa")]
mod visa;

#[derive(Debug, thiserror::Error)]
pub enum MeterSetupError {
    #[error("No instrument matches '{0}'")]
    NotFound(String),

    #[error("Built without VISA support, enable the `visa` feature")]
    Unsupported,

    #[cfg(feature = "visa")]
    #[error("VISA error: {0}")]
    Visa(#[from] visa_rs::Error),
}

/// Loads the Kinesis library and opens the configured servo.
pub fn create_stage(
    stage: &StageConfig,
    timing: &TimingConfig,
) -> Result<(CommandExecutor<StageHandler>, StageCommandSender), KinesisError> {
    let library = Arc::new(KinesisLibrary::load(
        &stage.library_dir,
        &stage.library_name,
        stage.simulation,
    )?);
    info!(path = %library.path().display(), simulation = library.is_simulation(), "Kinesis library loaded");

    library.build_device_list()?;
    let serials = library.ensure_attached(&stage.serial)?;
    info!(?serials, "Kinesis devices found");

    let mut servo = DcServo::open(library, &stage.serial)?;
    servo.start_polling(stage.polling_interval())?;
    servo.set_motor_params(stage.motor_params())?;
    info!(serial = %servo.serial(), "Stage opened");

    let handler = StageHandler::new(servo, timing.request_delay(), timing.arm_delay());
    let (executor, sender) = CommandExecutor::new(format!("stage {}", stage.serial), handler);

    Ok((executor, StageCommandSender::new(sender)))
}

/// Opens the first instrument matching the configured resource pattern.
pub fn create_meter(
    meter: &MeterConfig,
) -> Result<(CommandExecutor<MeterHandler>, MeterCommandSender), MeterSetupError> {
    let transport = open_transport(meter)?;
    let (executor, sender) = CommandExecutor::new("pm100d", MeterHandler::new(transport));

    Ok((executor, MeterCommandSender::new(sender)))
}

#[cfg(feature = "visa")]
fn open_transport(
    meter: &MeterConfig,
) -> Result<Box<dyn crate::command_executor::meter::Transport>, MeterSetupError> {
    let session = visa::open_first(&meter.resource_pattern, meter.open_timeout())?;
    Ok(Box::new(session))
}

#[cfg(not(feature = "visa"))]
fn open_transport(
    meter: &MeterConfig,
) -> Result<Box<dyn crate::command_executor::meter::Transport>, MeterSetupError> {
    tracing::warn!(pattern = %meter.resource_pattern, "Power meter requested without VISA support");
    Err(MeterSetupError::Unsupported)
}
