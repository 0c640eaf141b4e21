#![deny(unsafe_code)]
#![deny(warnings)]
//! Network error types

use defmt::Format;

/// Link and socket errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum NetworkError {
    /// Co-processor refused or failed the join request
    JoinFailed,
    /// Broker host is neither an IPv4 literal nor resolvable
    DnsError,
    /// TCP connect failed (refused, unreachable or invalid state)
    SocketError,
    /// Peer reset the connection
    ConnectionReset,
    /// No progress within the socket timeout
    Timeout,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::JoinFailed => write!(f, "WiFi join failed"),
            Self::DnsError => write!(f, "DNS resolution failed"),
            Self::SocketError => write!(f, "Socket error"),
            Self::ConnectionReset => write!(f, "Connection reset"),
            Self::Timeout => write!(f, "Request timeout"),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for NetworkError {}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError => embedded_io_async::ErrorKind::NotConnected,
            Self::ConnectionReset => embedded_io_async::ErrorKind::ConnectionReset,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}

impl From<embassy_net::tcp::Error> for NetworkError {
    fn from(_: embassy_net::tcp::Error) -> Self {
        // ConnectionReset is the only TCP I/O error
        Self::ConnectionReset
    }
}

impl From<embassy_net::tcp::ConnectError> for NetworkError {
    fn from(err: embassy_net::tcp::ConnectError) -> Self {
        match err {
            embassy_net::tcp::ConnectError::TimedOut => Self::Timeout,
            embassy_net::tcp::ConnectError::ConnectionReset => Self::ConnectionReset,
            _ => Self::SocketError,
        }
    }
}

/// Broker session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum MqttError {
    /// Socket-level failure underneath the session
    Network(NetworkError),
    /// Broker refused the CONNECT
    ConnectionFailed,
    /// Broker refused the subscription
    SubscribeRejected,
    PublishFailed,
    /// Malformed or unexpected traffic, or a string MQTT cannot carry
    ProtocolError,
    /// Operation attempted without an established session
    NotConnected,
}

impl core::fmt::Display for MqttError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Network(err) => write!(f, "Network error: {}", err),
            Self::ConnectionFailed => write!(f, "MQTT connection refused"),
            Self::SubscribeRejected => write!(f, "MQTT subscription rejected"),
            Self::PublishFailed => write!(f, "MQTT publish failed"),
            Self::ProtocolError => write!(f, "MQTT protocol error"),
            Self::NotConnected => write!(f, "MQTT session not connected"),
        }
    }
}

impl core::error::Error for MqttError {}

impl From<NetworkError> for MqttError {
    fn from(err: NetworkError) -> Self {
        Self::Network(err)
    }
}
