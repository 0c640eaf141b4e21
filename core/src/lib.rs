//! Platform-agnostic core logic for the sensor hub firmware
//!
//! This crate contains the device behavior shared by every board: the
//! cooperative connectivity/sampling loop, relay command handling, the
//! DHT11/DHT22 driver, JSON payloads and broker keep-alive bookkeeping.
//! It has NO hardware dependencies; boards plug in through the traits in
//! `sensor-hub-hal` and `embedded-hal`.
//!
//! # Layout
//!
//! - [`config`]: build-time configuration model and topic derivation
//! - [`schedule`]: fixed-interval bookkeeping on a millisecond tick
//! - [`relay`]: command vocabulary and the relay output
//! - [`sensor`]: DHT bit-level driver
//! - [`payload`]: JSON records published by the device
//! - [`keepalive`]: when to ping the broker and when to give up on it
//! - [`node`]: [`SensorNode`], the loop tying everything together
//!
//! The broker session itself is a [`BrokerSession`] supplied by the board.
//!
//! [`BrokerSession`]: sensor_hub_hal::BrokerSession

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// Must come first so the logging macros are visible to the other modules.
mod fmt;

pub mod config;
pub mod keepalive;
pub mod node;
pub mod payload;
pub mod relay;
pub mod schedule;
pub mod sensor;

#[cfg(test)]
mod testing;

pub use config::{NodeConfig, Topics};
pub use node::{Connectivity, SensorNode};
pub use relay::{Relay, RelayCommand};
