//! DHT11 / DHT22 single-wire driver
//!
//! Protocol, as seen on the data line (idle high through a pull-up):
//!
//! 1. Host pulls the line low (≥1 ms for DHT22, ≥18 ms for DHT11), then
//!    releases it.
//! 2. Sensor answers with 80 µs low, 80 µs high.
//! 3. 40 data bits follow, MSB first. Each bit is 50 µs low followed by a
//!    high pulse of ~26 µs (`0`) or ~70 µs (`1`).
//! 4. Byte 5 is the low byte of the sum of bytes 1-4.
//!
//! Bits are decided by sampling the line 35 µs after each rising edge.
//! The driver busy-waits on a blocking delay; boards should run `read`
//! with interrupts masked so bit timing is not disturbed.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use sensor_hub_hal::{HumiditySensor, Measurement};

use super::SensorError;
use crate::config::SensorKind;

/// Longest we wait for any single edge
const EDGE_TIMEOUT_US: u32 = 100;
/// Sample point after a rising edge; between the 26 µs and 70 µs pulses
const BIT_SAMPLE_US: u32 = 35;

/// DHT sensor on a single open-drain data pin
pub struct Dht<P, D> {
    pin: P,
    delay: D,
    kind: SensorKind,
}

impl<P, D> Dht<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D, kind: SensorKind) -> Self {
        Self { pin, delay, kind }
    }

    /// Run one transaction and return the raw 5-byte frame
    ///
    /// The checksum is verified; decoding is left to the caller.
    pub fn read_frame(&mut self) -> Result<[u8; 5], SensorError> {
        let start_ms = match self.kind {
            SensorKind::Dht11 => 20,
            SensorKind::Dht22 => 2,
        };

        self.pin.set_low().map_err(|_| SensorError::Pin)?;
        self.delay.delay_ms(start_ms);
        self.pin.set_high().map_err(|_| SensorError::Pin)?;

        // Response: line goes low, high, then low again before the first bit
        self.wait_for(false)?;
        self.wait_for(true)?;
        self.wait_for(false)?;

        let mut frame = [0u8; 5];
        for index in 0..40 {
            self.wait_for(true)?;
            self.delay.delay_us(BIT_SAMPLE_US);
            let bit = self.pin.is_high().map_err(|_| SensorError::Pin)?;
            if bit {
                self.wait_for(false)?;
            }
            let byte = &mut frame[index / 8];
            *byte = (*byte << 1) | u8::from(bit);
        }

        let sum = frame[..4]
            .iter()
            .fold(0u8, |acc, byte| acc.wrapping_add(*byte));
        if sum != frame[4] {
            return Err(SensorError::Checksum);
        }

        Ok(frame)
    }

    /// Spin until the line reaches `high`, failing after [`EDGE_TIMEOUT_US`]
    fn wait_for(&mut self, high: bool) -> Result<(), SensorError> {
        for _ in 0..EDGE_TIMEOUT_US {
            if self.pin.is_high().map_err(|_| SensorError::Pin)? == high {
                return Ok(());
            }
            self.delay.delay_us(1);
        }
        Err(SensorError::Timeout)
    }
}

/// Convert a checksummed frame into engineering units
pub fn decode(kind: SensorKind, frame: &[u8; 5]) -> Measurement {
    match kind {
        SensorKind::Dht22 => {
            let humidity = u16::from_be_bytes([frame[0], frame[1]]);
            let raw_temp = u16::from_be_bytes([frame[2] & 0x7F, frame[3]]);
            let mut temperature = f32::from(raw_temp) / 10.0;
            if frame[2] & 0x80 != 0 {
                temperature = -temperature;
            }
            Measurement {
                temperature_c: temperature,
                humidity_pct: f32::from(humidity) / 10.0,
            }
        }
        SensorKind::Dht11 => {
            let mut temperature = f32::from(frame[2]) + f32::from(frame[3] & 0x7F) / 10.0;
            if frame[3] & 0x80 != 0 {
                temperature = -temperature;
            }
            Measurement {
                temperature_c: temperature,
                humidity_pct: f32::from(frame[0]) + f32::from(frame[1]) / 10.0,
            }
        }
    }
}

impl<P, D> HumiditySensor for Dht<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    type Error = SensorError;

    fn read(&mut self) -> Result<Measurement, Self::Error> {
        let frame = self.read_frame()?;
        Ok(decode(self.kind, &frame))
    }
}
