//! The cooperative device loop
//!
//! [`SensorNode`] owns every piece of device state and is driven by one
//! task. Each [`SensorNode::poll`] runs, in order:
//!
//! 1. link-loss check
//! 2. network join, when disconnected and the retry interval has elapsed
//! 3. broker session, when the network is up and its retry interval has
//!    elapsed
//! 4. session servicing (keep-alive, at most one inbound command)
//! 5. sensor sampling, when the sample interval has elapsed
//!
//! A network join blocks the loop for up to `attempts × attempt_delay_ms`.
//! Nothing here is fatal: every failure is logged and retried on a fixed
//! interval.

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use heapless::String;
use sensor_hub_hal::{
    BrokerSession, HumiditySensor, Inbound, Monotonic, SessionOptions, WirelessLink,
};

use crate::config::NodeConfig;
use crate::fmt::Debug2Format;
use crate::keepalive::{KeepAlive, KeepAliveAction};
use crate::payload::{PresenceRecord, SensorRecord};
use crate::relay::{status_str, CommandError, Relay, RelayCommand};
use crate::schedule::Interval;

/// Longest relay command accepted, after trimming whitespace
pub const MAX_COMMAND_LEN: usize = 32;

type CommandText = String<MAX_COMMAND_LEN>;

/// Connectivity as seen by the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Connectivity {
    Disconnected,
    /// Wireless link up, no broker session
    NetworkUp,
    /// Broker session established and subscribed
    SessionUp,
}

/// The device: link, broker session, sensor and relay
pub struct SensorNode<'a, L, M, S, P, D, C> {
    config: &'a NodeConfig<'a>,
    link: L,
    session: M,
    sensor: S,
    relay: Relay<P>,
    delay: D,
    clock: C,
    state: Connectivity,
    keep_alive: KeepAlive,
    sample: Interval,
    network_retry: Interval,
    session_retry: Interval,
}

impl<'a, L, M, S, P, D, C> SensorNode<'a, L, M, S, P, D, C>
where
    L: WirelessLink,
    M: BrokerSession,
    S: HumiditySensor,
    P: OutputPin,
    D: DelayNs,
    C: Monotonic,
{
    pub fn new(
        config: &'a NodeConfig<'a>,
        link: L,
        session: M,
        sensor: S,
        relay: Relay<P>,
        delay: D,
        clock: C,
    ) -> Self {
        Self {
            config,
            link,
            session,
            sensor,
            relay,
            delay,
            clock,
            state: Connectivity::Disconnected,
            keep_alive: KeepAlive::new(config.broker.keep_alive_secs),
            sample: Interval::new(config.intervals.sample_ms),
            network_retry: Interval::new(config.intervals.network_retry_ms),
            session_retry: Interval::new(config.intervals.session_retry_ms),
        }
    }

    pub fn state(&self) -> Connectivity {
        self.state
    }

    pub fn relay_on(&self) -> bool {
        self.relay.is_on()
    }

    /// Boot sequence: relay off, then one network attempt
    pub async fn start(&mut self) {
        info!("Sensor hub {} starting", self.config.device_id);
        if let Err(err) = self.relay.set(false) {
            warn!("Relay output write failed: {:?}", Debug2Format(&err));
        }
        let now = self.clock.now_ms();
        self.connect_network().await;
        self.network_retry.mark(now);
    }

    /// Loop forever: one [`poll`](Self::poll), then the idle pause
    pub async fn run(&mut self) -> ! {
        loop {
            self.poll().await;
            self.delay.delay_ms(self.config.intervals.idle_ms).await;
        }
    }

    /// One iteration of the loop
    pub async fn poll(&mut self) {
        let now = self.clock.now_ms();

        if self.state != Connectivity::Disconnected && !self.link.is_up() {
            warn!("WiFi link lost");
            self.session.close();
            self.state = Connectivity::Disconnected;
        }

        if self.state == Connectivity::Disconnected && self.network_retry.is_due(now) {
            self.connect_network().await;
            self.network_retry.mark(now);
        }

        if self.state == Connectivity::NetworkUp && self.session_retry.is_due(now) {
            self.connect_session().await;
            self.session_retry.mark(now);
        }

        if self.state == Connectivity::SessionUp {
            self.service_session(now).await;
        }

        if self.sample.is_due(now) {
            self.sample().await;
            self.sample.mark(now);
        }
    }

    async fn connect_network(&mut self) {
        let config = self.config;
        let wifi = &config.wifi;
        info!("Connecting to WiFi: {}", wifi.ssid);

        if let Err(err) = self.link.join(wifi.ssid, wifi.password).await {
            warn!("WiFi join rejected: {:?}", Debug2Format(&err));
            return;
        }

        let mut attempts = 0;
        while !self.link.is_up() && attempts < config.join.attempts {
            self.delay.delay_ms(config.join.attempt_delay_ms).await;
            attempts += 1;
        }

        if !self.link.is_up() {
            warn!("WiFi connection failed after {} attempts", attempts);
            return;
        }

        self.state = Connectivity::NetworkUp;
        info!("WiFi connected");
        if let Some(ip) = self.link.ipv4_address() {
            let octets = ip.octets();
            info!(
                "IP address: {}.{}.{}.{}",
                octets[0], octets[1], octets[2], octets[3]
            );
        }
        if let Some(rssi) = self.link.rssi().await {
            info!("Signal strength (RSSI): {} dBm", rssi);
        }
    }

    /// Broker handshake, command subscription and the "online" presence
    async fn connect_session(&mut self) {
        let config = self.config;
        let broker = &config.broker;
        info!("Connecting to MQTT broker: {}:{}", broker.host, broker.port);

        let options = SessionOptions {
            client_id: config.device_id,
            keep_alive_secs: broker.keep_alive_secs,
            username: broker.username,
            password: broker.password,
        };
        if let Err(err) = self.session.connect(broker.host, broker.port, &options).await {
            warn!("MQTT connection failed: {:?}", Debug2Format(&err));
            self.session.close();
            return;
        }
        self.keep_alive.restart(self.clock.now_ms());
        info!("MQTT connected");

        let command_topic = config.topics.relay_command.as_str();
        if let Err(err) = self.session.subscribe(command_topic).await {
            warn!("Subscribe failed: {:?}", Debug2Format(&err));
            self.session.close();
            return;
        }
        info!("Subscribed to: {}", command_topic);

        self.state = Connectivity::SessionUp;
        self.publish_presence("online").await;
    }

    async fn publish_presence(&mut self, status: &str) {
        let record = PresenceRecord {
            device_id: self.config.device_id,
            status,
            timestamp_ms: self.clock.now_ms(),
            ip_address: self.link.ipv4_address(),
            rssi: self.link.rssi().await,
        };
        let json = match record.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!("Presence record not built: {}", err);
                return;
            }
        };

        let topic = self.config.topics.presence.as_str();
        match self.publish(topic, json.as_bytes(), true).await {
            Ok(()) => info!("Status published: {}", status),
            Err(err) => {
                warn!("Failed to publish status: {:?}", Debug2Format(&err));
                self.drop_session();
            }
        }
    }

    /// Keep-alive, then at most one inbound item
    async fn service_session(&mut self, now: u64) {
        match self.keep_alive.check(now) {
            KeepAliveAction::Idle => {}
            KeepAliveAction::Ping => {
                if let Err(err) = self.session.ping().await {
                    warn!("Keep-alive ping failed: {:?}", Debug2Format(&err));
                    self.drop_session();
                    return;
                }
                self.keep_alive.record_ping(now);
            }
            KeepAliveAction::Expired => {
                warn!("MQTT broker stopped answering pings");
                self.drop_session();
                return;
            }
        }

        let command = match self.session.poll().await {
            Ok(None) => return,
            Ok(Some(Inbound::PingResponse)) => {
                self.keep_alive.record_pong();
                return;
            }
            Ok(Some(Inbound::Message { topic, payload })) => {
                debug!("Message received on topic: {}", topic);
                if topic != self.config.topics.relay_command.as_str() {
                    return;
                }
                match command_text(payload) {
                    Some(text) => text,
                    None => {
                        warn!("Unreadable relay command ({} bytes)", payload.len());
                        return;
                    }
                }
            }
            Err(err) => {
                warn!("MQTT session lost: {:?}", Debug2Format(&err));
                self.drop_session();
                return;
            }
        };

        // Vocabulary misses are already logged
        let _ = self.handle_command(&command).await;
    }

    /// Decode and apply one relay command
    ///
    /// Unknown commands are logged and leave the relay untouched.
    pub async fn handle_command(&mut self, raw: &str) -> Result<(), CommandError> {
        match RelayCommand::parse(raw) {
            Ok(command) => {
                let target = command.resolve(self.relay.is_on());
                self.set_relay(target).await;
                Ok(())
            }
            Err(err) => {
                warn!("Unknown relay command: {}", raw);
                Err(err)
            }
        }
    }

    /// Drive the relay and publish the retained status if a session is up
    pub async fn set_relay(&mut self, on: bool) {
        if let Err(err) = self.relay.set(on) {
            warn!("Relay output write failed: {:?}", Debug2Format(&err));
            return;
        }
        let status = status_str(on);
        info!("Relay turned {}", status);

        if self.state != Connectivity::SessionUp {
            return;
        }
        let topic = self.config.topics.relay_status.as_str();
        if let Err(err) = self.publish(topic, status.as_bytes(), true).await {
            warn!("Failed to publish relay status: {:?}", Debug2Format(&err));
            self.drop_session();
        }
    }

    /// Read the sensor and publish one record
    ///
    /// A failed or non-finite reading abandons the cycle.
    pub async fn sample(&mut self) {
        let measurement = match self.sensor.read() {
            Ok(measurement) if measurement.is_valid() => measurement,
            Ok(_) => {
                warn!("Failed to read from DHT sensor: not a number");
                return;
            }
            Err(err) => {
                warn!("Failed to read from DHT sensor: {:?}", Debug2Format(&err));
                return;
            }
        };
        info!(
            "Temperature: {} C, humidity: {} %",
            measurement.temperature_c, measurement.humidity_pct
        );

        if self.state != Connectivity::SessionUp {
            info!("MQTT not connected - data not published");
            return;
        }

        let record = SensorRecord {
            device_id: self.config.device_id,
            timestamp_ms: self.clock.now_ms(),
            measurement,
            relay_on: self.relay.is_on(),
            rssi: self.link.rssi().await,
        };
        let json = match record.to_json() {
            Ok(json) => json,
            Err(err) => {
                warn!("Sensor record not built: {}", err);
                return;
            }
        };
        debug!("JSON payload: {}", json.as_str());

        let topic = self.config.topics.sensor_data.as_str();
        match self.publish(topic, json.as_bytes(), false).await {
            Ok(()) => info!("Sensor data published"),
            Err(err) => {
                warn!("Failed to publish sensor data: {:?}", Debug2Format(&err));
                self.drop_session();
            }
        }
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), M::Error> {
        self.session.publish(topic, payload, retain).await?;
        self.keep_alive.record_send(self.clock.now_ms());
        Ok(())
    }

    /// Fall back to `NetworkUp`; the session retry interval reconnects
    fn drop_session(&mut self) {
        self.session.close();
        if self.state == Connectivity::SessionUp {
            self.state = Connectivity::NetworkUp;
        }
    }
}

/// Trimmed command text, if the payload is UTF-8 and short enough
fn command_text(payload: &[u8]) -> Option<CommandText> {
    let text = core::str::from_utf8(payload).ok()?.trim();
    CommandText::try_from(text).ok()
}
