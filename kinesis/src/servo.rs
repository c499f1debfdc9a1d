use std::{
    ffi::{CString, c_double, c_int},
    sync::Arc,
    time::Duration,
};

use crate::{
    KinesisLibrary,
    error::{Result, check},
    status::StatusBits,
};

/// Unit type passed to the real/device conversion calls.
const DISTANCE: c_int = 0;

/// Calibration used by the vendor real/device unit conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorParams {
    pub steps_per_rev: f64,
    pub gearbox_ratio: f64,
    pub pitch: f64,
}

impl Default for MotorParams {
    /// MTS25-Z8.
    fn default() -> Self {
        Self {
            steps_per_rev: 512.0,
            gearbox_ratio: 67.49,
            pitch: 1.0,
        }
    }
}

/// Open T-Cube DC servo. Polling is stopped and the device closed on drop.
pub struct DcServo {
    library: Arc<KinesisLibrary>,
    serial: CString,
    polling: bool,
}

impl DcServo {
    pub fn open(library: Arc<KinesisLibrary>, serial: &str) -> Result<Self> {
        let serial = CString::new(serial)?;

        // SAFETY: `serial` is NUL terminated and outlives the call.
        let code = unsafe { (library.api().open)(serial.as_ptr()) };
        check("CC_Open", code)?;

        Ok(Self {
            library,
            serial,
            polling: false,
        })
    }

    pub fn serial(&self) -> &str {
        self.serial.to_str().unwrap_or_default()
    }

    pub fn start_polling(&mut self, interval: Duration) -> Result<()> {
        let millis = polling_millis(interval)?;
        let api = self.library.api();
        // SAFETY: device is open.
        let started = unsafe { (api.start_polling)(self.serial.as_ptr(), millis) };
        if !started {
            return Err(crate::KinesisError::Call {
                function: "CC_StartPolling",
                code: -1,
            });
        }
        self.polling = true;
        Ok(())
    }

    pub fn set_motor_params(&mut self, params: MotorParams) -> Result<()> {
        let api = self.library.api();
        // SAFETY: device is open.
        let code = unsafe {
            (api.set_motor_params_ext)(
                self.serial.as_ptr(),
                params.steps_per_rev,
                params.gearbox_ratio,
                params.pitch,
            )
        };
        check("CC_SetMotorParamsExt", code)
    }

    /// Asks the controller to refresh its cached position. The value becomes
    /// visible to `position` after a short delay.
    pub fn request_position(&mut self) -> Result<()> {
        // SAFETY: device is open.
        let code = unsafe { (self.library.api().request_position)(self.serial.as_ptr()) };
        check("CC_RequestPosition", code)
    }

    pub fn position(&self) -> i32 {
        // SAFETY: device is open.
        unsafe { (self.library.api().get_position)(self.serial.as_ptr()) }
    }

    pub fn request_status(&mut self) -> Result<()> {
        // SAFETY: device is open.
        let code = unsafe { (self.library.api().request_status_bits)(self.serial.as_ptr()) };
        check("CC_RequestStatusBits", code)
    }

    pub fn status(&self) -> StatusBits {
        // SAFETY: device is open.
        let bits = unsafe { (self.library.api().get_status_bits)(self.serial.as_ptr()) };
        StatusBits::from_bits_truncate(bits)
    }

    pub fn to_real(&self, device_units: i32) -> Result<f64> {
        let mut real: c_double = 0.0;
        // SAFETY: `real` is a valid out pointer for the duration of the call.
        let code = unsafe {
            (self.library.api().real_from_device)(
                self.serial.as_ptr(),
                device_units,
                &mut real,
                DISTANCE,
            )
        };
        check("CC_GetRealValueFromDeviceUnit", code)?;
        Ok(real)
    }

    pub fn to_device(&self, real_mm: f64) -> Result<i32> {
        let mut device: c_int = 0;
        // SAFETY: `device` is a valid out pointer for the duration of the call.
        let code = unsafe {
            (self.library.api().device_from_real)(
                self.serial.as_ptr(),
                real_mm,
                &mut device,
                DISTANCE,
            )
        };
        check("CC_GetDeviceUnitFromRealValue", code)?;
        Ok(device)
    }

    pub fn set_move_absolute(&mut self, device_units: i32) -> Result<()> {
        // SAFETY: device is open.
        let code = unsafe {
            (self.library.api().set_move_absolute_position)(self.serial.as_ptr(), device_units)
        };
        check("CC_SetMoveAbsolutePosition", code)
    }

    pub fn move_absolute(&mut self) -> Result<()> {
        // SAFETY: device is open.
        let code = unsafe { (self.library.api().move_absolute)(self.serial.as_ptr()) };
        check("CC_MoveAbsolute", code)
    }
}

fn polling_millis(interval: Duration) -> Result<c_int> {
    c_int::try_from(interval.as_millis())
        .ok()
        .filter(|&millis| millis > 0)
        .ok_or(crate::KinesisError::InvalidInterval(interval))
}

impl Drop for DcServo {
    fn drop(&mut self) {
        let api = self.library.api();
        // SAFETY: device was opened in `open` and is closed exactly once here.
        unsafe {
            if self.polling {
                (api.stop_polling)(self.serial.as_ptr());
            }
            (api.close)(self.serial.as_ptr());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polling_interval_must_fit_a_c_int() {
        assert_eq!(polling_millis(Duration::from_millis(200)).unwrap(), 200);
        assert!(matches!(
            polling_millis(Duration::from_millis(c_int::MAX as u64 + 1)),
            Err(crate::KinesisError::InvalidInterval(_))
        ));
        assert!(polling_millis(Duration::ZERO).is_err());
    }

    #[test]
    fn default_params_match_mts25_z8() {
        let params = MotorParams::default();
        assert_eq!(params.steps_per_rev, 512.0);
        assert_eq!(params.gearbox_ratio, 67.49);
        assert_eq!(params.pitch, 1.0);
    }
}
