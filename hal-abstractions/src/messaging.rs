//! Publish/subscribe broker session

use core::future::Future;

/// Login and liveness parameters for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions<'a> {
    /// Client identifier presented to the broker
    pub client_id: &'a str,
    /// Keep-alive interval in seconds (0 disables keep-alive)
    pub keep_alive_secs: u16,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
}

/// Something the broker sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Application message on a subscribed topic
    Message { topic: &'a str, payload: &'a [u8] },
    /// Answer to [`BrokerSession::ping`]
    PingResponse,
}

/// One client connection to a message broker
///
/// Implementations own their transport and reuse it across sessions:
/// after `close`, `connect` must be able to start over. Publishing is
/// fire-and-forget (at most once).
pub trait BrokerSession {
    /// Error type for any failed session operation
    type Error: core::fmt::Debug;

    /// Open the transport to `host:port` and complete the broker handshake
    fn connect(
        &mut self,
        host: &str,
        port: u16,
        options: &SessionOptions<'_>,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Subscribe to `filter` and wait for the broker to grant it
    fn subscribe(&mut self, filter: &str) -> impl Future<Output = Result<(), Self::Error>>;

    /// Send one message
    fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        retain: bool,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Send a keep-alive request; the answer arrives through [`poll`](Self::poll)
    fn ping(&mut self) -> impl Future<Output = Result<(), Self::Error>>;

    /// Take at most one inbound item without waiting for traffic
    ///
    /// Returns `Ok(None)` when nothing is buffered, and for broker traffic
    /// that needs no action from the caller.
    fn poll(&mut self) -> impl Future<Output = Result<Option<Inbound<'_>>, Self::Error>>;

    /// Drop the connection immediately
    fn close(&mut self);
}
