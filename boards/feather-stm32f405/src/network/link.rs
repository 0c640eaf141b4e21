#![deny(unsafe_code)]
#![deny(warnings)]
//! Wi-Fi station link
//!
//! Joining goes through the ESP32 control channel; the link counts as up
//! once the co-processor reports the station connected and DHCP has
//! configured an address on the embassy-net stack.

use core::net::Ipv4Addr;

use defmt::{info, warn, Debug2Format};
use embassy_net::Stack;
use embassy_net_esp_hosted::Control;
use sensor_hub_hal::WirelessLink;

use super::error::NetworkError;

pub struct WifiLink<'a> {
    stack: Stack<'a>,
    control: Control<'a>,
}

impl<'a> WifiLink<'a> {
    pub fn new(stack: Stack<'a>, control: Control<'a>) -> Self {
        Self { stack, control }
    }
}

impl WirelessLink for WifiLink<'_> {
    type Error = NetworkError;

    async fn join(&mut self, ssid: &str, password: &str) -> Result<(), Self::Error> {
        self.control.connect(ssid, password).await.map_err(|e| {
            warn!("Co-processor join error: {:?}", Debug2Format(&e));
            NetworkError::JoinFailed
        })?;
        info!("Associated with {}, waiting for DHCP", ssid);
        Ok(())
    }

    fn is_up(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }

    fn ipv4_address(&self) -> Option<Ipv4Addr> {
        self.stack
            .config_v4()
            .map(|config| config.address.address())
    }

    async fn rssi(&mut self) -> Option<i32> {
        match self.control.get_status().await {
            Ok(status) => Some(status.rssi),
            Err(e) => {
                warn!("RSSI unavailable: {:?}", Debug2Format(&e));
                None
            }
        }
    }
}
