use std::{
    ffi::CString,
    io::{self, Read, Write},
    time::Duration,
};

use tracing::info;
use visa_rs::prelude::*;

use super::MeterSetupError;

/// Instrument session that keeps its resource manager open.
pub struct VisaSession {
    instrument: Instrument,
    _rm: DefaultRM,
}

impl Read for VisaSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.instrument.read(buf)
    }
}

impl Write for VisaSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.instrument.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.instrument.flush()
    }
}

/// First resource matching `pattern`, opened without a lock.
pub fn open_first(pattern: &str, open_timeout: Duration) -> Result<VisaSession, MeterSetupError> {
    let rm = DefaultRM::new()?;
    let expr = CString::new(pattern).map_err(|_| MeterSetupError::NotFound(pattern.to_string()))?;

    let mut resources = rm.find_res_list(&expr.into())?;
    let Some(resource) = resources.find_next()? else {
        return Err(MeterSetupError::NotFound(pattern.to_string()));
    };

    info!(resource = ?resource, "Opening power meter");
    let instrument = rm.open(&resource, AccessMode::NO_LOCK, open_timeout)?;

    Ok(VisaSession {
        instrument,
        _rm: rm,
    })
}
