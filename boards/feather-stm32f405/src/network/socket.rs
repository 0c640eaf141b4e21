#![deny(unsafe_code)]
#![deny(warnings)]
//! Reusable TCP transport for the MQTT session
//!
//! Wraps one `embassy_net::tcp::TcpSocket` whose buffers live for the whole
//! program. `close` aborts the connection so the same socket can connect
//! again on the next session attempt.

use core::net::Ipv4Addr;

use defmt::{debug, info, warn, Debug2Format};
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, IpEndpoint, Stack};
use embassy_time::Duration;
use embedded_io_async::{ErrorType, Read, ReadReady, Write};
use sensor_hub_hal::Transport;

use super::error::NetworkError;

/// Socket timeout; bounds every blocking read, write and connect
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// TCP byte stream implementing [`Transport`]
pub struct TcpTransport<'a> {
    stack: Stack<'a>,
    socket: TcpSocket<'a>,
}

impl<'a> TcpTransport<'a> {
    /// Create the transport over static receive/transmit buffers
    pub fn new(stack: Stack<'a>, rx_buffer: &'a mut [u8], tx_buffer: &'a mut [u8]) -> Self {
        let mut socket = TcpSocket::new(stack, rx_buffer, tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        Self { stack, socket }
    }

    /// Dotted IPv4 literals are used as-is, anything else goes to DNS
    async fn resolve(&self, host: &str) -> Result<IpAddress, NetworkError> {
        if let Ok(addr) = host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(addr));
        }

        let addrs = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                warn!("DNS query failed: {:?}", Debug2Format(&e));
                NetworkError::DnsError
            })?;
        addrs.first().copied().ok_or_else(|| {
            warn!("DNS returned no results for {}", host);
            NetworkError::DnsError
        })
    }
}

impl ErrorType for TcpTransport<'_> {
    type Error = NetworkError;
}

impl Read for TcpTransport<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(self.socket.read(buf).await?)
    }
}

impl ReadReady for TcpTransport<'_> {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        // A peer that closed its side reads as end-of-stream right away
        Ok(self.socket.can_recv() || !self.socket.may_recv())
    }
}

impl Write for TcpTransport<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(self.socket.write(buf).await?)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(self.socket.flush().await?)
    }
}

impl Transport for TcpTransport<'_> {
    async fn open(&mut self, host: &str, port: u16) -> Result<(), Self::Error> {
        let endpoint = IpEndpoint::new(self.resolve(host).await?, port);
        debug!("Opening TCP connection to {}", Debug2Format(&endpoint));

        // A previous session may have left the socket half-open
        self.socket.abort();
        self.socket.connect(endpoint).await?;
        info!("TCP connection established to {}", Debug2Format(&endpoint));
        Ok(())
    }

    fn close(&mut self) {
        self.socket.abort();
    }
}
