//! Build-time configuration model
//!
//! Every value here is fixed when the firmware is built; boards assemble a
//! [`NodeConfig`] once at startup and hand it to the node by reference.
//! There is no runtime reconfiguration.

use heapless::String;

/// Maximum MQTT topic length
/// Format: "sensors/{device_id}/relay/status"; a 34-char UID-derived id
/// gives 55 chars, so 64 leaves some headroom for custom ids.
pub const MAX_TOPIC_LEN: usize = 64;

/// Fixed-capacity topic string
pub type Topic = String<MAX_TOPIC_LEN>;

/// Configuration construction errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Device identity is empty
    EmptyDeviceId,
    /// Identity contains an MQTT wildcard (`+`, `#`) or NUL
    InvalidTopicCharacter,
    /// Derived topic does not fit in [`MAX_TOPIC_LEN`]
    TopicTooLong,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyDeviceId => write!(f, "Device ID is empty"),
            Self::InvalidTopicCharacter => write!(f, "Device ID contains invalid topic characters"),
            Self::TopicTooLong => write!(f, "Topic exceeds maximum length"),
        }
    }
}

impl core::error::Error for ConfigError {}

/// The four topics the device uses, all rooted at `sensors/{device_id}/`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    /// Periodic sensor records (JSON)
    pub sensor_data: Topic,
    /// Inbound relay commands (plain text), the only subscription
    pub relay_command: Topic,
    /// Retained relay state, literal `ON` / `OFF`
    pub relay_status: Topic,
    /// Retained presence record (JSON), also used for the last will
    pub presence: Topic,
}

impl Topics {
    /// Derive the topic set for a device identity
    ///
    /// # Errors
    ///
    /// Rejects empty identities, identities containing `+`, `#` or NUL, and
    /// identities too long for [`MAX_TOPIC_LEN`].
    pub fn for_device(device_id: &str) -> Result<Self, ConfigError> {
        if device_id.is_empty() {
            return Err(ConfigError::EmptyDeviceId);
        }
        if device_id.contains(['+', '#', '\0']) {
            return Err(ConfigError::InvalidTopicCharacter);
        }

        Ok(Self {
            sensor_data: format_topic(device_id, "data")?,
            relay_command: format_topic(device_id, "relay/cmd")?,
            relay_status: format_topic(device_id, "relay/status")?,
            presence: format_topic(device_id, "status")?,
        })
    }
}

fn format_topic(device_id: &str, leaf: &str) -> Result<Topic, ConfigError> {
    let mut topic = Topic::new();
    for part in ["sensors/", device_id, "/", leaf] {
        topic
            .push_str(part)
            .map_err(|_| ConfigError::TopicTooLong)?;
    }
    Ok(topic)
}

/// Access point credentials
#[derive(Debug, Clone, Copy)]
pub struct WifiCredentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// MQTT broker endpoint and login
#[derive(Debug, Clone, Copy)]
pub struct BrokerConfig<'a> {
    /// Dotted IPv4 literal or DNS name
    pub host: &'a str,
    pub port: u16,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    /// Keep-alive interval in seconds (0 disables keep-alive)
    pub keep_alive_secs: u16,
}

impl Default for BrokerConfig<'_> {
    fn default() -> Self {
        Self {
            host: "192.168.1.100",
            port: 1883,
            username: None,
            password: None,
            keep_alive_secs: 15,
        }
    }
}

/// Loop timing, all in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    /// Between sensor samples
    pub sample_ms: u64,
    /// Between network join attempts while disconnected
    pub network_retry_ms: u64,
    /// Between broker session attempts while the network is up
    pub session_retry_ms: u64,
    /// Pause at the end of every loop iteration
    pub idle_ms: u32,
}

impl Default for Intervals {
    fn default() -> Self {
        Self {
            sample_ms: 10_000,
            network_retry_ms: 30_000,
            session_retry_ms: 5_000,
            idle_ms: 100,
        }
    }
}

/// How long a single network join attempt may block
///
/// The link is polled `attempts` times, `attempt_delay_ms` apart, so the
/// default caps one attempt at ten seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinPolicy {
    pub attempts: u8,
    pub attempt_delay_ms: u32,
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self {
            attempts: 20,
            attempt_delay_ms: 500,
        }
    }
}

/// Supported sensor models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorKind {
    Dht11,
    #[default]
    Dht22,
}

/// Relay board input polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RelayPolarity {
    /// Output high energizes the relay
    #[default]
    ActiveHigh,
    /// Output low energizes the relay (common opto-isolated modules)
    ActiveLow,
}

/// Complete node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig<'a> {
    /// Identity token: MQTT client id and `device_id` in every payload
    pub device_id: &'a str,
    pub wifi: WifiCredentials<'a>,
    pub broker: BrokerConfig<'a>,
    pub topics: Topics,
    pub intervals: Intervals,
    pub join: JoinPolicy,
    pub sensor: SensorKind,
    pub relay: RelayPolarity,
}

impl<'a> NodeConfig<'a> {
    /// Build a configuration with default timing, DHT22 and an active-high relay
    ///
    /// # Errors
    ///
    /// Fails if topics cannot be derived from `device_id`.
    pub fn new(
        device_id: &'a str,
        wifi: WifiCredentials<'a>,
        broker: BrokerConfig<'a>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            device_id,
            wifi,
            broker,
            topics: Topics::for_device(device_id)?,
            intervals: Intervals::default(),
            join: JoinPolicy::default(),
            sensor: SensorKind::default(),
            relay: RelayPolarity::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topics_for_device() {
        let topics = Topics::for_device("esp32_sensor_01").unwrap();
        assert_eq!(topics.sensor_data.as_str(), "sensors/esp32_sensor_01/data");
        assert_eq!(
            topics.relay_command.as_str(),
            "sensors/esp32_sensor_01/relay/cmd"
        );
        assert_eq!(
            topics.relay_status.as_str(),
            "sensors/esp32_sensor_01/relay/status"
        );
        assert_eq!(topics.presence.as_str(), "sensors/esp32_sensor_01/status");
    }

    #[test]
    fn test_uid_derived_id_fits() {
        let topics = Topics::for_device("stm32f405-0123456789abcdef01234567").unwrap();
        assert!(topics.relay_status.len() < MAX_TOPIC_LEN);
    }

    #[test]
    fn test_topics_reject_invalid_ids() {
        assert_eq!(Topics::for_device(""), Err(ConfigError::EmptyDeviceId));
        assert_eq!(
            Topics::for_device("client+wildcard"),
            Err(ConfigError::InvalidTopicCharacter)
        );
        assert_eq!(
            Topics::for_device("client#wildcard"),
            Err(ConfigError::InvalidTopicCharacter)
        );

        let long_id = "this_is_a_very_long_client_id_that_exceeds_the_maximum_allowed_topic_length";
        assert_eq!(Topics::for_device(long_id), Err(ConfigError::TopicTooLong));
    }

    #[test]
    fn test_default_timing() {
        let intervals = Intervals::default();
        assert_eq!(intervals.sample_ms, 10_000);
        assert_eq!(intervals.network_retry_ms, 30_000);
        assert_eq!(intervals.session_retry_ms, 5_000);

        let join = JoinPolicy::default();
        assert_eq!(u32::from(join.attempts) * join.attempt_delay_ms, 10_000);
    }

    #[test]
    fn test_node_config_defaults() {
        let wifi = WifiCredentials {
            ssid: "lab",
            password: "secret",
        };
        let config = NodeConfig::new("node-1", wifi, BrokerConfig::default()).unwrap();
        assert_eq!(config.broker.port, 1883);
        assert_eq!(config.sensor, SensorKind::Dht22);
        assert_eq!(config.relay, RelayPolarity::ActiveHigh);
        assert_eq!(config.topics.sensor_data.as_str(), "sensors/node-1/data");
    }
}
