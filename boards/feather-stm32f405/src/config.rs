#![deny(unsafe_code)]
#![deny(warnings)]
//! Build-time configuration
//!
//! Every value can be overridden with an environment variable when the
//! firmware is built (`WIFI_SSID=lab cargo build --release`):
//!
//! | Variable        | Default              |
//! |-----------------|----------------------|
//! | `WIFI_SSID`     | `YOUR_WIFI_SSID`     |
//! | `WIFI_PASSWORD` | `YOUR_WIFI_PASSWORD` |
//! | `MQTT_HOST`     | `192.168.1.100`      |
//! | `MQTT_PORT`     | `1883`               |
//! | `MQTT_USER`     | none                 |
//! | `MQTT_PASSWORD` | none                 |
//! | `DEVICE_ID`     | derived from the UID |

use sensor_hub_core::config::{
    BrokerConfig, ConfigError, NodeConfig, RelayPolarity, SensorKind, WifiCredentials,
};

const WIFI_SSID: &str = match option_env!("WIFI_SSID") {
    Some(ssid) => ssid,
    None => "YOUR_WIFI_SSID",
};

const WIFI_PASSWORD: &str = match option_env!("WIFI_PASSWORD") {
    Some(password) => password,
    None => "YOUR_WIFI_PASSWORD",
};

const MQTT_HOST: &str = match option_env!("MQTT_HOST") {
    Some(host) => host,
    None => "192.168.1.100",
};

const MQTT_PORT_DEFAULT: u16 = 1883;

/// DHT model wired to D10
const SENSOR: SensorKind = SensorKind::Dht22;

/// Relay module on D5
const RELAY: RelayPolarity = RelayPolarity::ActiveHigh;

fn mqtt_port() -> u16 {
    match option_env!("MQTT_PORT").map(str::parse) {
        Some(Ok(port)) => port,
        Some(Err(_)) => {
            defmt::warn!("MQTT_PORT is not a port number, using {}", MQTT_PORT_DEFAULT);
            MQTT_PORT_DEFAULT
        }
        None => MQTT_PORT_DEFAULT,
    }
}

/// Assemble the node configuration for `device_id`
pub fn node_config(device_id: &'static str) -> Result<NodeConfig<'static>, ConfigError> {
    let wifi = WifiCredentials {
        ssid: WIFI_SSID,
        password: WIFI_PASSWORD,
    };
    let broker = BrokerConfig {
        host: MQTT_HOST,
        port: mqtt_port(),
        username: option_env!("MQTT_USER"),
        password: option_env!("MQTT_PASSWORD"),
        ..BrokerConfig::default()
    };

    let mut config = NodeConfig::new(device_id, wifi, broker)?;
    config.sensor = SENSOR;
    config.relay = RELAY;
    Ok(config)
}
