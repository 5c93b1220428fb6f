//! UDP reception for tone packets.
//!
//! Receives use a bounded timeout so the caller's loop regains control
//! periodically to report statistics and notice shutdown.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tone_stream_common::{packet, FormatError, PacketHeader};
use tracing::{debug, info, warn};

/// What one receive attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveEvent {
    /// A well-formed packet.
    Packet {
        header: PacketHeader,
        payload: Vec<u8>,
        src: SocketAddr,
    },

    /// A datagram no longer than the header; skipped.
    Undersized { len: usize, src: SocketAddr },

    /// Nothing arrived within the receive timeout.
    TimedOut,
}

/// UDP receiver for tone datagrams.
pub struct ToneReceiver {
    // ---
    socket: UdpSocket,
    buf: Vec<u8>,
    timeout: Duration,
    packets_received: u64,
    bytes_received: u64,
    packets_dropped: u64,
}

impl ToneReceiver {
    // ---
    /// Binds to `0.0.0.0:<port>` with address reuse enabled.
    ///
    /// `max_datagram_len` sizes the receive buffer; longer datagrams are
    /// truncated by the OS. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if socket binding fails.
    pub fn bind(port: u16, max_datagram_len: usize, timeout: Duration) -> Result<Self> {
        // ---
        let addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, port).into();

        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .context("failed to create UDP socket")?;
        socket
            .set_reuse_address(true)
            .context("failed to set SO_REUSEADDR")?;
        #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
        if let Err(e) = socket.set_reuse_port(true) {
            debug!("SO_REUSEPORT unavailable: {}", e);
        }
        socket
            .bind(&addr.into())
            .with_context(|| format!("failed to bind UDP socket to {}", addr))?;
        socket
            .set_nonblocking(true)
            .context("failed to make UDP socket non-blocking")?;

        let socket = UdpSocket::from_std(socket.into()).context("failed to register UDP socket")?;
        info!("Listening on UDP {}", socket.local_addr()?);

        Ok(Self {
            socket,
            buf: vec![0u8; max_datagram_len.max(packet::HEADER_LEN + 1)],
            timeout,
            packets_received: 0,
            bytes_received: 0,
            packets_dropped: 0,
        })
    }

    /// Waits up to the receive timeout for the next datagram.
    ///
    /// Undersized datagrams are logged and reported, never returned as
    /// errors.
    ///
    /// # Errors
    ///
    /// Returns error if the socket itself fails.
    pub async fn receive(&mut self) -> Result<ReceiveEvent> {
        // ---
        let (len, src) =
            match tokio::time::timeout(self.timeout, self.socket.recv_from(&mut self.buf)).await {
                Err(_) => return Ok(ReceiveEvent::TimedOut),
                Ok(result) => result.context("failed to receive UDP packet")?,
            };

        self.bytes_received += len as u64;

        match packet::decode(&self.buf[..len]) {
            Ok((header, payload)) => {
                self.packets_received += 1;

                if self.packets_received % 500 == 0 {
                    debug!(
                        "Received {} packets ({} bytes, {} dropped) from {} - seq={}",
                        self.packets_received,
                        self.bytes_received,
                        self.packets_dropped,
                        src,
                        header.sequence
                    );
                }

                Ok(ReceiveEvent::Packet {
                    header,
                    payload: payload.to_vec(),
                    src,
                })
            }
            Err(FormatError::Undersized { len }) => {
                self.packets_dropped += 1;
                warn!("Received undersized packet ({} bytes) from {}", len, src);
                Ok(ReceiveEvent::Undersized { len, src })
            }
        }
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        // ---
        Ok(self.socket.local_addr()?)
    }

    /// Returns (packets_received, bytes_received, packets_dropped).
    pub fn stats(&self) -> (u64, u64, u64) {
        // ---
        (
            self.packets_received,
            self.bytes_received,
            self.packets_dropped,
        )
    }
}
