use kinesis::{KinesisError, StatusBits};
use utilities::{
    command_executor::{CommandSender, ExecutorError},
    motor_controller::{LinearStage, MotorState},
};

use super::commands::{StageCommand, StageResponse};

pub type StageError = ExecutorError<KinesisError>;

/// Status word as seen by the settle loop. Forward (CW) is increasing position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageState(pub StatusBits);

impl MotorState for StageState {
    fn start_switch(&self) -> bool {
        self.0.reverse_limit()
    }

    fn end_switch(&self) -> bool {
        self.0.forward_limit()
    }

    fn is_moving(&self) -> bool {
        self.0.is_moving()
    }
}

#[derive(Clone)]
pub struct StageCommandSender {
    sender: CommandSender<StageCommand>,
}

impl StageCommandSender {
    pub fn new(sender: CommandSender<StageCommand>) -> Self {
        Self { sender }
    }

    fn unexpected(&self) -> StageError {
        ExecutorError::UnexpectedResponse(self.sender.name().to_string())
    }

    /// Position in device and real units.
    pub async fn get_position(&self) -> Result<(i32, f64), StageError> {
        match self.sender.send_command(StageCommand::GetPosition).await? {
            StageResponse::Position {
                device_units,
                real_mm,
            } => Ok((device_units, real_mm)),
            _ => Err(self.unexpected()),
        }
    }

    pub async fn get_status(&self) -> Result<StatusBits, StageError> {
        match self.sender.send_command(StageCommand::GetStatus).await? {
            StageResponse::Status(status) => Ok(status),
            _ => Err(self.unexpected()),
        }
    }
}

impl LinearStage for StageCommandSender {
    type Error = StageError;
    type State = StageState;

    async fn position(&self) -> Result<f64, StageError> {
        self.get_position().await.map(|(_, real_mm)| real_mm)
    }

    async fn state(&self) -> Result<StageState, StageError> {
        self.get_status().await.map(StageState)
    }

    async fn to_device_units(&self, position: f64) -> Result<i32, StageError> {
        match self
            .sender
            .send_command(StageCommand::ToDeviceUnits(position))
            .await?
        {
            StageResponse::DeviceUnits(device_units) => Ok(device_units),
            _ => Err(self.unexpected()),
        }
    }

    async fn start_move(&self, device_units: i32) -> Result<(), StageError> {
        match self
            .sender
            .send_command(StageCommand::MoveAbsolute(device_units))
            .await?
        {
            StageResponse::Ok => Ok(()),
            _ => Err(self.unexpected()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_switches_map_to_travel_ends() {
        let forward = StageState(StatusBits::CW_HARDWARE_LIMIT);
        assert!(forward.end_switch());
        assert!(!forward.start_switch());

        let reverse = StageState(StatusBits::CCW_SOFTWARE_LIMIT);
        assert!(reverse.start_switch());
        assert!(!reverse.end_switch());

        assert!(StageState(StatusBits::MOVING_CW).is_moving());
    }
}
