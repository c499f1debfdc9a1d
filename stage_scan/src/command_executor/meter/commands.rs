use std::io;

use pm100d::MeterSettings;
use utilities::command_executor::Command;

use crate::command_executor::meter::MeterHandler;

#[derive(Debug, Clone)]
pub enum MeterCommand {
    Identify,
    Beep,
    Configure(MeterSettings),
    ReadBatch(usize),
}

#[derive(Debug)]
pub enum MeterResponse {
    Identity(String),
    Readings(Vec<f64>),
    Ok,
}

impl Command for MeterCommand {
    type Response = MeterResponse;
    type Handler = MeterHandler;

    fn execute(self, handler: &mut Self::Handler) -> io::Result<Self::Response> {
        match self {
            MeterCommand::Identify => Ok(MeterResponse::Identity(handler.identify()?)),
            MeterCommand::Beep => {
                handler.beep()?;
                Ok(MeterResponse::Ok)
            }
            MeterCommand::Configure(settings) => {
                handler.configure(&settings)?;
                Ok(MeterResponse::Ok)
            }
            MeterCommand::ReadBatch(count) => Ok(MeterResponse::Readings(handler.read_batch(count)?)),
        }
    }
}
