use std::io;

use pm100d::MeterSettings;
use utilities::command_executor::{CommandSender, ExecutorError};

use crate::scan::PowerMeter;

use super::commands::{MeterCommand, MeterResponse};

pub type MeterError = ExecutorError<io::Error>;

#[derive(Clone)]
pub struct MeterCommandSender {
    sender: CommandSender<MeterCommand>,
}

impl MeterCommandSender {
    pub fn new(sender: CommandSender<MeterCommand>) -> Self {
        Self { sender }
    }

    fn unexpected(&self) -> MeterError {
        ExecutorError::UnexpectedResponse(self.sender.name().to_string())
    }

    async fn expect_ok(&self, command: MeterCommand) -> Result<(), MeterError> {
        match self.sender.send_command(command).await? {
            MeterResponse::Ok => Ok(()),
            _ => Err(self.unexpected()),
        }
    }

    pub async fn identify(&self) -> Result<String, MeterError> {
        match self.sender.send_command(MeterCommand::Identify).await? {
            MeterResponse::Identity(idn) => Ok(idn),
            _ => Err(self.unexpected()),
        }
    }

    pub async fn beep(&self) -> Result<(), MeterError> {
        self.expect_ok(MeterCommand::Beep).await
    }
}

impl PowerMeter for MeterCommandSender {
    type Error = MeterError;

    async fn configure(&self, settings: MeterSettings) -> Result<(), MeterError> {
        self.expect_ok(MeterCommand::Configure(settings)).await
    }

    async fn read_batch(&self, count: usize) -> Result<Vec<f64>, MeterError> {
        match self.sender.send_command(MeterCommand::ReadBatch(count)).await? {
            MeterResponse::Readings(readings) => Ok(readings),
            _ => Err(self.unexpected()),
        }
    }
}
