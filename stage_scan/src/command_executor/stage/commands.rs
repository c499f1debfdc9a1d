use kinesis::{KinesisError, StatusBits};
use utilities::command_executor::Command;

use crate::command_executor::stage::StageHandler;

#[derive(Debug, Clone)]
pub enum StageCommand {
    GetPosition,
    GetStatus,
    ToDeviceUnits(f64),
    MoveAbsolute(i32),
}

#[derive(Debug)]
pub enum StageResponse {
    Position { device_units: i32, real_mm: f64 },
    Status(StatusBits),
    DeviceUnits(i32),
    Ok,
}

impl Command for StageCommand {
    type Response = StageResponse;
    type Handler = StageHandler;

    fn execute(self, handler: &mut Self::Handler) -> Result<Self::Response, KinesisError> {
        match self {
            StageCommand::GetPosition => {
                let (device_units, real_mm) = handler.position()?;
                Ok(StageResponse::Position {
                    device_units,
                    real_mm,
                })
            }
            StageCommand::GetStatus => {
                let status = handler.status()?;
                Ok(StageResponse::Status(status))
            }
            StageCommand::ToDeviceUnits(real_mm) => {
                let device_units = handler.to_device(real_mm)?;
                Ok(StageResponse::DeviceUnits(device_units))
            }
            StageCommand::MoveAbsolute(device_units) => {
                handler.move_absolute(device_units)?;
                Ok(StageResponse::Ok)
            }
        }
    }
}
