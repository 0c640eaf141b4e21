#![deny(unsafe_code)]
#![deny(warnings)]
//! Millisecond tick for the node's intervals, read from the TIM2 monotonic

use rtic_monotonics::Monotonic as _;
use sensor_hub_hal::Monotonic;

use crate::Mono;

#[derive(Clone, Copy)]
pub struct MonoClock;

impl Monotonic for MonoClock {
    fn now_ms(&self) -> u64 {
        Mono::now().duration_since_epoch().to_millis()
    }
}
