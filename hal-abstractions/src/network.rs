//! Network link and byte-stream transport traits

use core::future::Future;
use core::net::Ipv4Addr;

use embedded_io_async::{Read, ReadReady, Write};

/// A wireless network interface (station mode)
///
/// `join` starts association with an access point and may return before an
/// address has been obtained; callers poll [`WirelessLink::is_up`] to learn
/// when the link is usable.
pub trait WirelessLink {
    /// Error type for a failed join request
    type Error: core::fmt::Debug;

    /// Begin associating with the given network
    fn join(
        &mut self,
        ssid: &str,
        password: &str,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Associated and configured with an IPv4 address
    fn is_up(&self) -> bool;

    /// Current IPv4 address, if configured
    fn ipv4_address(&self) -> Option<Ipv4Addr>;

    /// Received signal strength in dBm, if associated
    fn rssi(&mut self) -> impl Future<Output = Option<i32>>;
}

/// Reconnectable, ordered byte stream (typically a TCP socket)
///
/// The same transport is reused for every session: `close` followed by
/// `open` must leave it ready for a fresh connection. `read_ready` lets a
/// broker session check for inbound traffic without blocking the main loop.
pub trait Transport: Read + Write + ReadReady {
    /// Open a connection to `host:port`
    ///
    /// `host` is either a dotted IPv4 literal or a DNS name.
    fn open(&mut self, host: &str, port: u16) -> impl Future<Output = Result<(), Self::Error>>;

    /// Drop the connection immediately
    fn close(&mut self);
}
