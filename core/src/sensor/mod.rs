//! Temperature/humidity sensing
//!
//! The [`dht`] driver implements [`sensor_hub_hal::HumiditySensor`] for the
//! DHT11 and DHT22 single-wire sensors on top of any `embedded-hal` pin
//! that can both drive and sense the line (open-drain).

pub mod dht;

pub use dht::Dht;

/// Sensor read errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// The sensor did not produce an expected edge in time
    Timeout,
    /// Frame checksum mismatch
    Checksum,
    /// The data pin reported an error
    Pin,
}

impl core::fmt::Display for SensorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "Sensor response timeout"),
            Self::Checksum => write!(f, "Sensor checksum mismatch"),
            Self::Pin => write!(f, "Sensor pin error"),
        }
    }
}

impl core::error::Error for SensorError {}
