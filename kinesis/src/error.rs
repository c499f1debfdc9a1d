use std::ffi::NulError;

#[derive(Debug, thiserror::Error)]
pub enum KinesisError {
    #[error("Failed to load Kinesis library '{path}': {source}")]
    Load {
        path: String,
        source: libloading::Error,
    },

    #[error("Kinesis library has no symbol '{name}': {source}")]
    Symbol {
        name: &'static str,
        source: libloading::Error,
    },

    #[error("Failed to build device list, error code {0}")]
    DeviceList(i16),

    #[error("Device {0} is not attached")]
    DeviceNotFound(String),

    #[error("Serial number contains an interior NUL byte: {0}")]
    InvalidSerial(#[from] NulError),

    #[error("Polling interval {0:?} does not fit in a millisecond count")]
    InvalidInterval(std::time::Duration),

    #[error("{function} failed with error code {code}")]
    Call { function: &'static str, code: i16 },
}

pub type Result<T> = std::result::Result<T, KinesisError>;

/// Kinesis calls return zero on success.
pub(crate) fn check(function: &'static str, code: i16) -> Result<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(KinesisError::Call { function, code })
    }
}
