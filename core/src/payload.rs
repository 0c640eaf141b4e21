//! JSON records published by the device
//!
//! Records are written straight into a fixed-capacity `heapless::String`
//! with `core::fmt`; there is no intermediate document. Key order is fixed.
//!
//! Sensor record:
//! `{"device_id":"..","timestamp":N,"temperature":T,"humidity":H,"relay_state":"ON","wifi_rssi":R}`
//!
//! Presence record:
//! `{"device_id":"..","status":"online","timestamp":N,"ip_address":"a.b.c.d","wifi_rssi":R}`

use core::fmt::{self, Display, Write};
use core::net::Ipv4Addr;

use heapless::String;
use sensor_hub_hal::Measurement;

use crate::relay::status_str;

/// Largest record we ever publish
pub const MAX_PAYLOAD_LEN: usize = 256;

pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Payload formatting errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PayloadError {
    /// Record does not fit in [`MAX_PAYLOAD_LEN`]
    Overflow,
    /// A measurement is NaN or infinite
    InvalidNumber,
}

impl Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Overflow => write!(f, "Payload buffer overflow"),
            Self::InvalidNumber => write!(f, "Measurement is not a finite number"),
        }
    }
}

impl core::error::Error for PayloadError {}

impl From<fmt::Error> for PayloadError {
    fn from(_: fmt::Error) -> Self {
        Self::Overflow
    }
}

/// One published sensor sample
#[derive(Debug, Clone, Copy)]
pub struct SensorRecord<'a> {
    pub device_id: &'a str,
    /// Milliseconds since boot
    pub timestamp_ms: u64,
    pub measurement: Measurement,
    pub relay_on: bool,
    pub rssi: Option<i32>,
}

impl SensorRecord<'_> {
    pub fn to_json(&self) -> Result<Payload, PayloadError> {
        if !self.measurement.is_valid() {
            return Err(PayloadError::InvalidNumber);
        }

        let mut out = Payload::new();
        write!(
            out,
            "{{\"device_id\":{},\"timestamp\":{},\"temperature\":{},\"humidity\":{},\"relay_state\":{},\"wifi_rssi\":{}}}",
            JsonStr(self.device_id),
            self.timestamp_ms,
            Fixed2(self.measurement.temperature_c),
            Fixed2(self.measurement.humidity_pct),
            JsonStr(status_str(self.relay_on)),
            OptNumber(self.rssi),
        )?;
        Ok(out)
    }
}

/// Presence announcement on the status topic
#[derive(Debug, Clone, Copy)]
pub struct PresenceRecord<'a> {
    pub device_id: &'a str,
    pub status: &'a str,
    pub timestamp_ms: u64,
    pub ip_address: Option<Ipv4Addr>,
    pub rssi: Option<i32>,
}

impl PresenceRecord<'_> {
    pub fn to_json(&self) -> Result<Payload, PayloadError> {
        let ip = self.ip_address.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let mut out = Payload::new();
        write!(
            out,
            "{{\"device_id\":{},\"status\":{},\"timestamp\":{},\"ip_address\":\"{}\",\"wifi_rssi\":{}}}",
            JsonStr(self.device_id),
            JsonStr(self.status),
            self.timestamp_ms,
            ip,
            OptNumber(self.rssi),
        )?;
        Ok(out)
    }
}

/// Number with exactly two decimals, rounded half away from zero
struct Fixed2(f32);

impl Display for Fixed2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scaled = f64::from(self.0) * 100.0;
        let biased = if scaled >= 0.0 {
            scaled + 0.5
        } else {
            scaled - 0.5
        };
        // Truncation toward zero after the bias rounds half away from zero
        let hundredths = biased as i64;
        let sign = if hundredths < 0 { "-" } else { "" };
        let magnitude = hundredths.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}

/// Quoted, escaped JSON string
struct JsonStr<'a>(&'a str);

impl Display for JsonStr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char('"')?;
        for c in self.0.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\r' => f.write_str("\\r")?,
                '\t' => f.write_str("\\t")?,
                c if u32::from(c) < 0x20 => write!(f, "\\u{:04x}", u32::from(c))?,
                c => f.write_char(c)?,
            }
        }
        f.write_char('"')
    }
}

/// Integer or `null`
struct OptNumber(Option<i32>);

impl Display for OptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(value) => write!(f, "{}", value),
            None => f.write_str("null"),
        }
    }
}
