//! UDP transmission for tone packets.
//!
//! Best-effort: a failed or short send is logged and counted, never retried.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{Context, Result};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

/// Lower bound for the kernel send buffer.
const MIN_SEND_BUFFER: usize = 64 * 1024;

/// Result of one send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The whole datagram was handed to the kernel.
    Sent(usize),

    /// Fewer bytes than requested were written.
    Short { sent: usize, expected: usize },

    /// The socket reported an error.
    Failed,
}

/// UDP sender for tone datagrams.
pub struct ToneSender {
    // ---
    socket: UdpSocket,
    destination: SocketAddr,
    packets_sent: u64,
    bytes_sent: u64,
    short_sends: u64,
}

impl ToneSender {
    // ---
    /// Creates a sender bound to an ephemeral local port.
    ///
    /// The kernel send buffer is sized to hold at least four datagrams of
    /// `datagram_len` bytes (and never less than 64 KiB). Must be called
    /// from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns error if the socket cannot be created or bound.
    pub fn new(destination: SocketAddr, datagram_len: usize) -> Result<Self> {
        // ---
        let socket = Socket::new(
            Domain::for_address(destination),
            Type::DGRAM,
            Some(Protocol::UDP),
        )
        .context("failed to create UDP socket")?;

        let send_buffer = (datagram_len * 4).max(MIN_SEND_BUFFER);
        if let Err(e) = socket.set_send_buffer_size(send_buffer) {
            warn!("Could not set send buffer to {} bytes: {}", send_buffer, e);
        }

        let local: SocketAddr = if destination.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        socket
            .bind(&local.into())
            .context("failed to bind UDP socket")?;
        socket
            .set_nonblocking(true)
            .context("failed to make UDP socket non-blocking")?;

        let socket = UdpSocket::from_std(socket.into()).context("failed to register UDP socket")?;
        debug!("UDP socket bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            destination,
            packets_sent: 0,
            bytes_sent: 0,
            short_sends: 0,
        })
    }

    /// Sends one encoded datagram to the destination.
    ///
    /// Errors are logged and reported through the outcome; the caller keeps
    /// streaming either way since UDP offers nothing to retry against.
    pub async fn send(&mut self, datagram: &[u8]) -> SendOutcome {
        // ---
        match self.socket.send_to(datagram, self.destination).await {
            Ok(sent) if sent == datagram.len() => {
                self.packets_sent += 1;
                self.bytes_sent += sent as u64;

                if self.packets_sent % 500 == 0 {
                    debug!(
                        "Sent {} packets ({} bytes) to {}",
                        self.packets_sent, self.bytes_sent, self.destination
                    );
                }
                SendOutcome::Sent(sent)
            }
            Ok(sent) => {
                self.short_sends += 1;
                self.bytes_sent += sent as u64;
                warn!("Short send: {} of {} bytes", sent, datagram.len());
                SendOutcome::Short {
                    sent,
                    expected: datagram.len(),
                }
            }
            Err(e) => {
                error!("Failed to send to {}: {}", self.destination, e);
                SendOutcome::Failed
            }
        }
    }

    /// Local address of the socket.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        // ---
        Ok(self.socket.local_addr()?)
    }

    /// Returns (packets_sent, bytes_sent, short_sends).
    pub fn stats(&self) -> (u64, u64, u64) {
        // ---
        (self.packets_sent, self.bytes_sent, self.short_sends)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_sender_creation() {
        // ---
        let sender = ToneSender::new("127.0.0.1:50005".parse().unwrap(), 1776);
        assert!(sender.is_ok());
    }

    #[tokio::test]
    async fn test_sender_delivers_datagram() {
        // ---
        let listener = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = listener.local_addr().unwrap();

        let mut sender = ToneSender::new(dest, 16).expect("sender creation failed");
        let outcome = sender.send(&[7u8; 16]).await;
        assert_eq!(outcome, SendOutcome::Sent(16));

        let mut buf = [0u8; 64];
        let (len, _) = listener.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], &[7u8; 16]);

        assert_eq!(sender.stats(), (1, 16, 0));
    }
}
