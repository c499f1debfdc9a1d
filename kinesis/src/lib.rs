use std::{
    ffi::c_char,
    path::{Path, PathBuf},
};

use api::Api;
use libloading::Library;

mod api;
pub mod error;
pub mod servo;
pub mod status;

pub use error::{KinesisError, Result};
pub use servo::{DcServo, MotorParams};
pub use status::StatusBits;

pub const DEFAULT_LIBRARY_DIR: &str = r"C:\Program Files\Thorlabs\Kinesis";
pub const DCSERVO_LIBRARY: &str = "Thorlabs.MotionControl.TCube.DCServo.dll";

/// Loaded Kinesis T-Cube DC servo library.
///
/// Share it through an `Arc`: every `DcServo` keeps the library loaded until it
/// has been closed.
pub struct KinesisLibrary {
    api: Api,
    path: PathBuf,
    simulation: bool,
    _library: Library,
}

impl KinesisLibrary {
    pub fn load(dir: impl AsRef<Path>, file_name: &str, simulation: bool) -> Result<Self> {
        let path = dir.as_ref().join(file_name);

        // SAFETY: loading runs the library initialisers; Kinesis has none that
        // depend on caller state.
        let library = unsafe { Library::new(&path) }.map_err(|source| KinesisError::Load {
            path: path.display().to_string(),
            source,
        })?;
        let api = Api::resolve(&library)?;

        if simulation {
            // SAFETY: symbol resolved from the loaded library.
            unsafe { (api.initialize_simulations)() };
        }

        Ok(Self {
            api,
            path,
            simulation,
            _library: library,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    pub(crate) fn api(&self) -> &Api {
        &self.api
    }

    pub fn build_device_list(&self) -> Result<()> {
        // SAFETY: no arguments.
        let code = unsafe { (self.api.build_device_list)() };
        if code != 0 {
            return Err(KinesisError::DeviceList(code));
        }
        Ok(())
    }

    /// Serial numbers of every attached device. Call `build_device_list` first.
    pub fn device_serials(&self) -> Result<Vec<String>> {
        // SAFETY: no arguments.
        let count = unsafe { (self.api.get_device_list_size)() };
        if count <= 0 {
            return Ok(Vec::new());
        }

        // Serials are 8 digits, comma separated.
        let mut buffer = vec![0 as c_char; count as usize * 9 + 1];
        // SAFETY: the buffer length passed matches the allocation.
        let code = unsafe {
            (self.api.get_device_list_ext)(buffer.as_mut_ptr(), buffer.len() as u32)
        };
        error::check("TLI_GetDeviceListExt", code)?;

        let bytes: Vec<u8> = buffer
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();

        Ok(parse_serial_list(&String::from_utf8_lossy(&bytes)))
    }

    /// Fails with `DeviceNotFound` unless `serial` is attached. Returns every
    /// attached serial.
    pub fn ensure_attached(&self, serial: &str) -> Result<Vec<String>> {
        let serials = self.device_serials()?;
        require_serial(&serials, serial)?;
        Ok(serials)
    }
}

impl Drop for KinesisLibrary {
    fn drop(&mut self) {
        if self.simulation {
            // SAFETY: library is still loaded, it is dropped after this.
            unsafe { (self.api.uninitialize_simulations)() };
        }
    }
}

pub fn parse_serial_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn require_serial(serials: &[String], serial: &str) -> Result<()> {
    if serials.iter().any(|s| s == serial) {
        Ok(())
    } else {
        Err(KinesisError::DeviceNotFound(serial.to_string()))
    }
}
