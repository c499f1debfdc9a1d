use std::io::{self, Read, Write};

use commands::MeterCommand;
use pm100d::{MeterSettings, Pm100d};
use utilities::command_executor::DeviceHandler;

pub mod command_sender;
pub mod commands;

/// Byte stream to the instrument, a VISA session in production.
pub trait Transport: Read + Write + Send {}

impl<T: Read + Write + Send> Transport for T {}

pub struct MeterHandler {
    transport: Box<dyn Transport>,
    pm100d: Pm100d,
}

impl DeviceHandler for MeterHandler {
    type Command = MeterCommand;
    type Error = io::Error;
}

impl MeterHandler {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            pm100d: Pm100d::new(),
        }
    }

    pub fn identify(&mut self) -> io::Result<String> {
        self.pm100d.identify(&mut self.transport)
    }

    pub fn beep(&mut self) -> io::Result<()> {
        self.pm100d.beep(&mut self.transport)
    }

    pub fn configure(&mut self, settings: &MeterSettings) -> io::Result<()> {
        self.pm100d.configure(&mut self.transport, settings)
    }

    pub fn read_batch(&mut self, count: usize) -> io::Result<Vec<f64>> {
        self.pm100d.read_batch(&mut self.transport, count)
    }
}
