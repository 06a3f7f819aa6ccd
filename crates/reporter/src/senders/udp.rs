//! UdpSender - UDP fire-and-forget payload streaming

use std::net::SocketAddr;

use bytes::Bytes;
use contracts::{ContractError, PayloadSender};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

/// Sender emitting each payload as one datagram
pub struct UdpSender {
    name: String,
    target: SocketAddr,
    max_packet_size: usize,
    socket: UdpSocket,
}

impl UdpSender {
    /// Create a new UdpSender connected to `target`
    #[instrument(name = "udp_sender_new", skip(name))]
    pub async fn new(
        name: impl Into<String>,
        target: SocketAddr,
        max_packet_size: usize,
    ) -> std::io::Result<Self> {
        let name = name.into();
        // Bind to any available port of the target's family
        let bind_addr: SocketAddr = if target.is_ipv6() {
            ([0u16; 8], 0).into()
        } else {
            ([0, 0, 0, 0], 0).into()
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(target).await?;

        debug!(sender = %name, target = %target, "UdpSender connected");

        Ok(Self {
            name,
            target,
            max_packet_size,
            socket,
        })
    }

    /// Create from a `host:port` string
    pub async fn from_addr(
        name: impl Into<String>,
        addr: &str,
        max_packet_size: usize,
    ) -> std::io::Result<Self> {
        let target = tokio::net::lookup_host(addr)
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("address '{}' did not resolve", addr),
                )
            })?;
        Self::new(name, target, max_packet_size).await
    }

    /// Target address
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl PayloadSender for UdpSender {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "udp_sender_send",
        skip(self, payload, cancel),
        fields(sender = %self.name, bytes = payload.len())
    )]
    async fn send(&self, payload: Bytes, cancel: CancellationToken) -> Result<(), ContractError> {
        if payload.len() > self.max_packet_size {
            return Err(ContractError::send(
                &self.name,
                format!(
                    "payload of {} bytes exceeds max packet size {}",
                    payload.len(),
                    self.max_packet_size
                ),
            ));
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(ContractError::Cancelled),
            result = self.socket.send(&payload) => {
                let sent = result.map_err(|e| ContractError::send(&self.name, e.to_string()))?;
                debug!(sender = %self.name, bytes = sent, "Sent");
                Ok(())
            }
        }
    }
}
