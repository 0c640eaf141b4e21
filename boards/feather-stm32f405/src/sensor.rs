#![deny(unsafe_code)]
#![deny(warnings)]
//! DHT sensor wiring
//!
//! The DHT bit timing is in the tens of microseconds, so the whole read runs
//! inside a critical section on a cycle-counting delay. Neither the
//! embassy-time driver nor the RTIC monotonic is usable with interrupts
//! masked.

use embassy_stm32::gpio::OutputOpenDrain;
use embedded_hal::delay::DelayNs;
use sensor_hub_core::sensor::{Dht, SensorError};
use sensor_hub_hal::{HumiditySensor, Measurement};

/// Core clock configured in `init`
const SYSCLK_HZ: u32 = 84_000_000;
const CYCLES_PER_US: u32 = SYSCLK_HZ / 1_000_000;

/// Busy-wait delay counted in core cycles
pub struct CycleDelay;

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (u64::from(ns) * u64::from(CYCLES_PER_US)).div_ceil(1_000);
        cortex_m::asm::delay(u32::try_from(cycles).unwrap_or(u32::MAX));
    }

    fn delay_us(&mut self, us: u32) {
        cortex_m::asm::delay(us.saturating_mul(CYCLES_PER_US));
    }
}

/// DHT on an open-drain pin, read with interrupts masked
pub struct BoardSensor {
    dht: Dht<OutputOpenDrain<'static>, CycleDelay>,
}

impl BoardSensor {
    pub fn new(dht: Dht<OutputOpenDrain<'static>, CycleDelay>) -> Self {
        Self { dht }
    }
}

impl HumiditySensor for BoardSensor {
    type Error = SensorError;

    fn read(&mut self) -> Result<Measurement, Self::Error> {
        critical_section::with(|_| self.dht.read())
    }
}
