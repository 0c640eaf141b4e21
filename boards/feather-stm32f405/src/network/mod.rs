#![deny(warnings)]
//! Network plumbing behind the core traits
//!
//! - **`error`**: `NetworkError`, the link and socket error enum
//! - **`link`**: `WifiLink`, the `WirelessLink` over the ESP32 control
//!   channel and the embassy-net stack
//! - **`socket`**: `TcpTransport`, the reusable MQTT byte stream
//! - **`mqtt`**: `MqttSession`, the `BrokerSession` over `rust-mqtt`
//!
//! The co-processor driver comes from `wifi`; the embassy-net stack and
//! both runners live in the network task alongside the node loop.

pub mod error;
pub mod link;
pub mod mqtt;
pub mod socket;

pub use error::NetworkError;
pub use link::WifiLink;
pub use mqtt::{MqttSession, SharedSocket};
pub use socket::TcpTransport;
