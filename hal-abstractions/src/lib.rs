//! Hardware abstraction traits for the sensor hub firmware
//!
//! This crate defines traits that abstract over hardware differences
//! between boards. BSPs implement these traits; `sensor-hub-core` consumes
//! them.
//!
//! Plain digital I/O and delays come straight from `embedded-hal` /
//! `embedded-hal-async` and are not redefined here.

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod messaging;
pub mod network;
pub mod sensor;

pub use clock::Monotonic;
pub use messaging::{BrokerSession, Inbound, SessionOptions};
pub use network::{Transport, WirelessLink};
pub use sensor::{HumiditySensor, Measurement};
