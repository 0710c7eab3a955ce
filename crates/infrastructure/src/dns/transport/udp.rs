//! UDP transport to an upstream nameserver (RFC 1035 §4.2.1).
//!
//! Messages are sent as-is. A response with the TC bit set must be retried
//! over TCP by the caller.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use nsresolv_domain::DomainError;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::debug;

/// Largest datagram accepted from an upstream (EDNS0 ceiling).
pub const MAX_UDP_RESPONSE_SIZE: u16 = 4096;

pub struct UdpTransport {
    server_addr: SocketAddr,
}

impl UdpTransport {
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    fn bind_addr(&self) -> SocketAddr {
        if self.server_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        }
    }
}

#[async_trait]
impl DnsTransport for UdpTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        let socket = UdpSocket::bind(self.bind_addr()).await.map_err(|e| {
            DomainError::Forward(format!("Failed to bind UDP socket: {}", e))
        })?;

        // A connected socket drops datagrams from any other source.
        socket.connect(self.server_addr).await.map_err(|e| {
            DomainError::Forward(format!("Failed to connect UDP socket to {}: {}", self.server_addr, e))
        })?;

        let exchange = async {
            socket.send(message_bytes).await?;
            let mut recv_buf = vec![0u8; usize::from(MAX_UDP_RESPONSE_SIZE)];
            let n = socket.recv(&mut recv_buf).await?;
            recv_buf.truncate(n);
            Ok::<_, std::io::Error>(recv_buf)
        };

        let bytes = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| {
                DomainError::Forward(format!(
                    "Timeout waiting for UDP response from {}",
                    self.server_addr
                ))
            })?
            .map_err(|e| {
                DomainError::Forward(format!("UDP exchange with {} failed: {}", self.server_addr, e))
            })?;

        debug!(
            server = %self.server_addr,
            bytes_sent = message_bytes.len(),
            bytes_received = bytes.len(),
            "UDP exchange complete"
        );

        Ok(TransportResponse {
            bytes,
            protocol_used: "UDP",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "UDP"
    }
}
