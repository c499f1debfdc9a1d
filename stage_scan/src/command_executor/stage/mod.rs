use std::time::Duration;

use commands::StageCommand;
use kinesis::{DcServo, KinesisError, StatusBits};
use utilities::command_executor::DeviceHandler;

pub mod command_sender;
pub mod commands;

/// Owns the open servo on the executor thread.
pub struct StageHandler {
    servo: DcServo,
    request_delay: Duration,
    arm_delay: Duration,
}

impl DeviceHandler for StageHandler {
    type Command = StageCommand;
    type Error = KinesisError;
}

impl StageHandler {
    pub fn new(servo: DcServo, request_delay: Duration, arm_delay: Duration) -> Self {
        Self {
            servo,
            request_delay,
            arm_delay,
        }
    }

    /// Requests a fresh position and waits for the polled value to update.
    pub fn position(&mut self) -> Result<(i32, f64), KinesisError> {
        self.servo.request_position()?;
        std::thread::sleep(self.request_delay);

        let device_units = self.servo.position();
        let real = self.servo.to_real(device_units)?;
        Ok((device_units, real))
    }

    pub fn status(&mut self) -> Result<StatusBits, KinesisError> {
        self.servo.request_status()?;
        std::thread::sleep(self.request_delay);
        Ok(self.servo.status())
    }

    pub fn to_device(&mut self, real_mm: f64) -> Result<i32, KinesisError> {
        self.servo.to_device(real_mm)
    }

    pub fn move_absolute(&mut self, device_units: i32) -> Result<(), KinesisError> {
        self.servo.set_move_absolute(device_units)?;
        std::thread::sleep(self.arm_delay);
        self.servo.move_absolute()
    }
}
