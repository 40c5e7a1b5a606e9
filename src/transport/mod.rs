//! Endpoint transport abstraction.
//!
//! The dispatcher and its clients only ever need two operations: receive the
//! next packet on an endpoint they own, and send a packet to some endpoint.
//!
//! Supports:
//! - Channel: in-process bounded queues (standalone mode, tests)
//! - UDS: Unix datagram sockets, one socket file per endpoint

pub mod channel;
#[cfg(all(unix, feature = "uds"))]
pub mod uds;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::packet::{ControlPacket, EndpointId, PacketError};

pub use channel::ChannelTransport;
#[cfg(all(unix, feature = "uds"))]
pub use uds::UdsTransport;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while moving packets.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Endpoint {0} is unreachable")]
    Unreachable(EndpointId),

    #[error("Endpoint {0} is full")]
    Full(EndpointId),

    #[error("Endpoint {0} was torn down")]
    Closed(EndpointId),

    #[error("Endpoint {0} is already bound")]
    AddressInUse(EndpointId),

    #[error("Transport type '{0}' is not available in this build")]
    Unsupported(String),

    #[error("Malformed packet: {0}")]
    Packet(#[from] PacketError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receiving side of an endpoint.
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Endpoint this inbox is bound to.
    fn endpoint(&self) -> EndpointId;

    /// Wait for the next packet.
    ///
    /// Returns `TransportError::Closed` once the endpoint is torn down.
    async fn recv(&mut self) -> Result<ControlPacket>;
}

/// Addressable, FIFO-per-destination packet transport.
///
/// Implementations:
/// - `ChannelTransport`: tokio mpsc queues within one process
/// - `UdsTransport`: Unix datagram sockets under a shared base path
#[async_trait]
pub trait Transport: Send + Sync {
    /// Claim an endpoint for receiving.
    async fn bind(&self, endpoint: EndpointId) -> Result<Box<dyn Inbox>>;

    /// Best-effort send, waiting for room at the destination.
    async fn send(&self, to: EndpointId, packet: &ControlPacket) -> Result<()>;

    /// Best-effort send that fails with `TransportError::Full` instead of waiting.
    async fn try_send(&self, to: EndpointId, packet: &ControlPacket) -> Result<()>;
}

// ============================================================================
// Configuration
// ============================================================================

/// Transport type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportType {
    /// Unix datagram sockets (multi-process).
    #[default]
    Uds,
    /// In-process channels (single process).
    Channel,
}

/// Transport configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Transport type discriminator.
    #[serde(rename = "type")]
    pub transport_type: TransportType,
    /// UDS-specific configuration.
    pub uds: UdsConfig,
    /// Channel-specific configuration.
    pub channel: ChannelConfig,
}

/// UDS transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UdsConfig {
    /// Directory holding one socket file per endpoint.
    pub base_path: PathBuf,
}

impl Default for UdsConfig {
    fn default() -> Self {
        Self {
            base_path: PathBuf::from("/tmp/catbus"),
        }
    }
}

impl UdsConfig {
    /// Create config with custom base path.
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Socket path an endpoint resolves to.
    pub fn socket_path(&self, endpoint: EndpointId) -> PathBuf {
        self.base_path.join(format!("endpoint-{}.sock", endpoint))
    }
}

/// Channel transport configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Queue depth per endpoint.
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self { capacity: 64 }
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Initialize a transport based on configuration.
///
/// The channel transport only connects parties living in the same process.
pub fn init_transport(config: &TransportConfig) -> Result<Arc<dyn Transport>> {
    match config.transport_type {
        TransportType::Channel => {
            info!(
                transport = "channel",
                capacity = config.channel.capacity,
                "Transport initialized"
            );
            Ok(Arc::new(ChannelTransport::new(config.channel.capacity)))
        }
        TransportType::Uds => {
            #[cfg(all(unix, feature = "uds"))]
            {
                info!(
                    transport = "uds",
                    base_path = %config.uds.base_path.display(),
                    "Transport initialized"
                );
                Ok(Arc::new(UdsTransport::new(config.uds.clone())?))
            }

            #[cfg(not(all(unix, feature = "uds")))]
            {
                Err(TransportError::Unsupported("uds".to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_config_default() {
        let config = TransportConfig::default();
        assert_eq!(config.transport_type, TransportType::Uds);
        assert_eq!(config.uds.base_path, PathBuf::from("/tmp/catbus"));
        assert_eq!(config.channel.capacity, 64);
    }

    #[test]
    fn test_uds_socket_path() {
        let config = UdsConfig::with_base_path("/tmp/test");
        assert_eq!(
            config.socket_path(EndpointId(42)),
            PathBuf::from("/tmp/test/endpoint-42.sock")
        );
    }

    #[tokio::test]
    async fn test_init_channel_transport() {
        let config = TransportConfig {
            transport_type: TransportType::Channel,
            ..Default::default()
        };
        let transport = init_transport(&config).unwrap();
        let inbox = transport.bind(EndpointId(1)).await.unwrap();
        assert_eq!(inbox.endpoint(), EndpointId(1));
    }
}
