#![deny(warnings)]
//! MQTT v5.0 broker session over the plain TCP transport
//!
//! A thin [`BrokerSession`] wrapper around the `rust-mqtt` client. The client
//! takes ownership of its network handle on every `connect`, so the one
//! [`TcpTransport`] lives behind a mutex and the client gets a copyable
//! [`SharedTransport`] handle to it. That keeps the socket and its static
//! buffers reusable across sessions, and lets `poll` look at the socket
//! before handing control to the client.
//!
//! # Memory Management
//!
//! - MQTT packet buffer: bump allocator over a static slice (see `main.rs`)
//! - TCP buffers: owned by [`TcpTransport`]
//! - Inbound topic and payload: copied into fixed buffers here

#![allow(unsafe_code)] // TopicName::new_unchecked

use defmt::{debug, info, warn, Debug2Format};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_io_async::{ErrorType, Read, ReadReady, Write};
use heapless::{String, Vec};
use rust_mqtt::{
    buffer::BumpBuffer,
    client::{
        event::Event,
        options::{
            ConnectOptions, PublicationOptions, RetainHandling, SubscriptionOptions,
            TopicReference,
        },
        Client,
    },
    config::{KeepAlive, SessionExpiryInterval},
    types::{MqttBinary, MqttString, QoS, TopicFilter, TopicName},
    Bytes,
};
use sensor_hub_hal::{BrokerSession, Inbound, SessionOptions, Transport};

use super::error::{MqttError, NetworkError};
use super::socket::TcpTransport;

/// Longest inbound topic kept; longer ones are dropped
const MAX_TOPIC_LEN: usize = 128;
/// Longest inbound payload kept; relay commands are far shorter
const MAX_PAYLOAD_LEN: usize = 128;

/// The socket, shared between the client and the session wrapper
pub type SharedSocket = Mutex<NoopRawMutex, TcpTransport<'static>>;

/// Handle the client reads and writes through
///
/// Each call locks the socket only for its own duration.
#[derive(Clone, Copy)]
pub struct SharedTransport(&'static SharedSocket);

impl ErrorType for SharedTransport {
    type Error = NetworkError;
}

impl Read for SharedTransport {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.0.lock().await.read(buf).await
    }
}

impl Write for SharedTransport {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.lock().await.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        self.0.lock().await.flush().await
    }
}

type RustMqttClient = Client<'static, SharedTransport, BumpBuffer<'static>, 1, 1, 1, 0>;

/// MQTT v5.0 session implementing [`BrokerSession`]
///
/// Publishes at QoS 0 with a clean start on every connect and no will.
pub struct MqttSession {
    socket: &'static SharedSocket,
    client: RustMqttClient,
    connected: bool,
    topic: String<MAX_TOPIC_LEN>,
    payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl MqttSession {
    pub fn new(socket: &'static SharedSocket, buffer: &'static mut BumpBuffer<'static>) -> Self {
        Self {
            socket,
            client: Client::new(buffer),
            connected: false,
            topic: String::new(),
            payload: Vec::new(),
        }
    }

    fn ensure_connected(&self) -> Result<(), MqttError> {
        if self.connected {
            Ok(())
        } else {
            Err(MqttError::NotConnected)
        }
    }

    async fn next_event(&mut self) -> Result<Event<'static>, MqttError> {
        self.client.poll().await.map_err(|e| {
            warn!("MQTT receive failed: {:?}", Debug2Format(&e));
            MqttError::ProtocolError
        })
    }
}

fn mqtt_string(value: &str) -> Result<MqttString<'_>, MqttError> {
    MqttString::new(value.into()).map_err(|e| {
        warn!("Failed to create MQTT string: {:?}", Debug2Format(&e));
        MqttError::ProtocolError
    })
}

/// Topic names must be non-empty and free of wildcards and NUL
fn topic_name(topic: &str) -> Result<TopicName<'_>, MqttError> {
    if topic.is_empty() || topic.contains(['+', '#', '\0']) {
        warn!("Not a publishable topic: {}", topic);
        return Err(MqttError::ProtocolError);
    }
    let topic = mqtt_string(topic)?;
    // SAFETY: checked above for emptiness, wildcards and NUL, which is all
    // TopicName::new would reject
    Ok(unsafe { TopicName::new_unchecked(topic) })
}

fn topic_filter(filter: &str) -> Result<TopicFilter<'_>, MqttError> {
    TopicFilter::new(mqtt_string(filter)?).map_err(|e| {
        warn!("Invalid topic filter {}: {:?}", filter, Debug2Format(&e));
        MqttError::ProtocolError
    })
}

impl BrokerSession for MqttSession {
    type Error = MqttError;

    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        options: &SessionOptions<'_>,
    ) -> Result<(), Self::Error> {
        self.connected = false;
        self.socket.lock().await.open(host, port).await?;

        let password = match options.password {
            Some(password) => Some(MqttBinary::new(password.as_bytes().into()).map_err(|e| {
                warn!("Failed to create MQTT password: {:?}", Debug2Format(&e));
                MqttError::ProtocolError
            })?),
            None => None,
        };
        let connect_opts = ConnectOptions {
            session_expiry_interval: SessionExpiryInterval::EndOnDisconnect,
            clean_start: true,
            keep_alive: if options.keep_alive_secs == 0 {
                KeepAlive::Infinite
            } else {
                KeepAlive::Seconds(options.keep_alive_secs)
            },
            will: None,
            user_name: options.username.map(mqtt_string).transpose()?,
            password,
        };
        let client_id = mqtt_string(options.client_id)?;

        self.client
            .connect(SharedTransport(self.socket), &connect_opts, Some(client_id))
            .await
            .map_err(|e| {
                warn!("MQTT connect failed: {:?}", Debug2Format(&e));
                MqttError::ConnectionFailed
            })?;

        self.connected = true;
        info!("MQTT session established as {}", options.client_id);
        Ok(())
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), Self::Error> {
        self.ensure_connected()?;
        let subscription = SubscriptionOptions {
            retain_handling: RetainHandling::AlwaysSend,
            retain_as_published: false,
            no_local: false,
            qos: QoS::AtMostOnce,
        };
        let packet_id = self
            .client
            .subscribe(topic_filter(filter)?, subscription)
            .await
            .map_err(|e| {
                warn!("MQTT subscribe failed: {:?}", Debug2Format(&e));
                MqttError::ProtocolError
            })?;

        // Reads are bounded by the socket timeout
        loop {
            match self.next_event().await? {
                Event::Suback(suback) if suback.packet_identifier == packet_id => {
                    return if suback.reason_code.is_success() {
                        Ok(())
                    } else {
                        let reason = Debug2Format(&suback.reason_code);
                        warn!("Broker rejected {}: {:?}", filter, reason);
                        Err(MqttError::SubscribeRejected)
                    };
                }
                other => debug!("Waiting for SUBACK, skipped {:?}", Debug2Format(&other)),
            }
        }
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> Result<(), Self::Error> {
        self.ensure_connected()?;
        let pub_options = PublicationOptions {
            retain,
            message_expiry_interval: None,
            topic: TopicReference::Name(topic_name(topic)?),
            qos: QoS::AtMostOnce,
        };

        self.client
            .publish(&pub_options, Bytes::from(payload))
            .await
            .map_err(|e| {
                warn!("Failed to publish to {}: {:?}", topic, Debug2Format(&e));
                MqttError::PublishFailed
            })?;
        debug!("Published {} bytes to {}", payload.len(), topic);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), Self::Error> {
        self.ensure_connected()?;
        self.client.ping().await.map_err(|e| {
            warn!("MQTT ping failed: {:?}", Debug2Format(&e));
            MqttError::ProtocolError
        })
    }

    async fn poll(&mut self) -> Result<Option<Inbound<'_>>, Self::Error> {
        self.ensure_connected()?;

        // The client only reads once bytes are waiting, so poll never blocks
        let ready = match self.socket.try_lock() {
            Ok(mut socket) => socket.read_ready()?,
            Err(_) => false,
        };
        if !ready {
            return Ok(None);
        }

        match self.next_event().await? {
            Event::Publish(publish) => {
                let topic: &str = publish.topic.as_ref();
                let message: &[u8] = publish.message.as_ref();

                self.topic.clear();
                self.payload.clear();
                if self.topic.push_str(topic).is_err()
                    || self.payload.extend_from_slice(message).is_err()
                {
                    warn!(
                        "Dropped oversized message on {} ({} bytes)",
                        topic,
                        message.len()
                    );
                    return Ok(None);
                }
                Ok(Some(Inbound::Message {
                    topic: &self.topic,
                    payload: &self.payload,
                }))
            }
            Event::Pingresp => Ok(Some(Inbound::PingResponse)),
            other => {
                debug!("Ignored broker event {:?}", Debug2Format(&other));
                Ok(None)
            }
        }
    }

    fn close(&mut self) {
        self.connected = false;
        match self.socket.try_lock() {
            Ok(mut socket) => socket.close(),
            Err(_) => warn!("Socket busy, left open"),
        }
    }
}
