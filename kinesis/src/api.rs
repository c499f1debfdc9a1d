use std::ffi::{c_char, c_double, c_int, c_short};

use libloading::Library;

use crate::error::{KinesisError, Result};

type NoArgsShort = unsafe extern "C" fn() -> c_short;
type NoArgs = unsafe extern "C" fn();
type GetDeviceListExt = unsafe extern "C" fn(*mut c_char, u32) -> c_short;
type SerialShort = unsafe extern "C" fn(*const c_char) -> c_short;
type SerialVoid = unsafe extern "C" fn(*const c_char);
type StartPolling = unsafe extern "C" fn(*const c_char, c_int) -> bool;
type SetMotorParamsExt =
    unsafe extern "C" fn(*const c_char, c_double, c_double, c_double) -> c_short;
type GetPosition = unsafe extern "C" fn(*const c_char) -> c_int;
type GetStatusBits = unsafe extern "C" fn(*const c_char) -> u32;
type RealFromDevice = unsafe extern "C" fn(*const c_char, c_int, *mut c_double, c_int) -> c_short;
type DeviceFromReal = unsafe extern "C" fn(*const c_char, c_double, *mut c_int, c_int) -> c_short;
type SetMoveAbsolutePosition = unsafe extern "C" fn(*const c_char, c_int) -> c_short;

/// Function table resolved from the T-Cube DC servo library.
///
/// The pointers stay valid for as long as the `Library` they were resolved from
/// is loaded; `KinesisLibrary` keeps both together.
#[derive(Clone, Copy)]
pub(crate) struct Api {
    pub build_device_list: NoArgsShort,
    pub get_device_list_size: NoArgsShort,
    pub get_device_list_ext: GetDeviceListExt,
    pub initialize_simulations: NoArgs,
    pub uninitialize_simulations: NoArgs,

    pub open: SerialShort,
    pub close: SerialVoid,
    pub start_polling: StartPolling,
    pub stop_polling: SerialVoid,
    pub set_motor_params_ext: SetMotorParamsExt,

    pub request_position: SerialShort,
    pub get_position: GetPosition,
    pub request_status_bits: SerialShort,
    pub get_status_bits: GetStatusBits,

    pub real_from_device: RealFromDevice,
    pub device_from_real: DeviceFromReal,

    pub set_move_absolute_position: SetMoveAbsolutePosition,
    pub move_absolute: SerialShort,
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let mut c_name = Vec::with_capacity(name.len() + 1);
    c_name.extend_from_slice(name.as_bytes());
    c_name.push(0);

    // SAFETY: every `T` used below matches the C prototype exported by Kinesis.
    unsafe { library.get::<T>(&c_name) }
        .map(|sym| *sym)
        .map_err(|source| KinesisError::Symbol { name, source })
}

impl Api {
    pub fn resolve(library: &Library) -> Result<Self> {
        Ok(Self {
            build_device_list: symbol(library, "TLI_BuildDeviceList")?,
            get_device_list_size: symbol(library, "TLI_GetDeviceListSize")?,
            get_device_list_ext: symbol(library, "TLI_GetDeviceListExt")?,
            initialize_simulations: symbol(library, "TLI_InitializeSimulations")?,
            uninitialize_simulations: symbol(library, "TLI_UninitializeSimulations")?,

            open: symbol(library, "CC_Open")?,
            close: symbol(library, "CC_Close")?,
            start_polling: symbol(library, "CC_StartPolling")?,
            stop_polling: symbol(library, "CC_StopPolling")?,
            set_motor_params_ext: symbol(library, "CC_SetMotorParamsExt")?,

            request_position: symbol(library, "CC_RequestPosition")?,
            get_position: symbol(library, "CC_GetPosition")?,
            request_status_bits: symbol(library, "CC_RequestStatusBits")?,
            get_status_bits: symbol(library, "CC_GetStatusBits")?,

            real_from_device: symbol(library, "CC_GetRealValueFromDeviceUnit")?,
            device_from_real: symbol(library, "CC_GetDeviceUnitFromRealValue")?,

            set_move_absolute_position: symbol(library, "CC_SetMoveAbsolutePosition")?,
            move_absolute: symbol(library, "CC_MoveAbsolute")?,
        })
    }
}
