#![deny(unsafe_code)]
#![deny(warnings)]
//! Device identity for the sensor hub
//!
//! The identity is the MQTT client id and the `device_id` field of every
//! payload. A `DEVICE_ID` set at build time wins; otherwise it is derived
//! from the factory-programmed 96-bit unique ID, which is stable across
//! reboots and unique to each chip.

use heapless::String;

const UID_PREFIX: &str = "stm32f405-";

/// Maximum length of the device identity
/// Format: "stm32f405-" (10 chars) + 24 hex chars = 34 chars for derived ids
pub const DEVICE_ID_MAX_LEN: usize = 40;

pub type DeviceId = String<DEVICE_ID_MAX_LEN>;

/// Errors building the identity
#[derive(Debug, Clone, Copy, defmt::Format)]
pub enum DeviceIdError {
    /// Configured `DEVICE_ID` is longer than [`DEVICE_ID_MAX_LEN`]
    TooLong,
}

/// Build-time `DEVICE_ID`, or `stm32f405-{uid}` when unset
pub fn device_id() -> Result<DeviceId, DeviceIdError> {
    let mut id = DeviceId::new();
    let built = match option_env!("DEVICE_ID") {
        Some(configured) => id.push_str(configured),
        None => id
            .push_str(UID_PREFIX)
            .and_then(|()| id.push_str(embassy_stm32::uid::uid_hex())),
    };
    built.map_err(|()| DeviceIdError::TooLong)?;
    Ok(id)
}
