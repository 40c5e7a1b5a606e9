//! Unix datagram transport.
//!
//! Endpoint `N` is a datagram socket at `<base_path>/endpoint-N.sock`. Each
//! datagram carries exactly one encoded frame, so message boundaries come for
//! free and per-destination order is the kernel queue order.

use std::io::ErrorKind;
use std::os::unix::net::UnixDatagram as StdUnixDatagram;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::net::UnixDatagram;
use tracing::{debug, info, warn};

use super::{Inbox, Result, Transport, TransportError, UdsConfig};
use crate::packet::{self, ControlPacket, EndpointId, FRAME_SIZE};

/// RAII guard for cleaning up an endpoint's socket file.
pub struct UdsCleanupGuard {
    path: PathBuf,
}

impl UdsCleanupGuard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for UdsCleanupGuard {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to clean up endpoint socket"
                );
            } else {
                debug!(path = %self.path.display(), "Cleaned up endpoint socket");
            }
        }
    }
}

/// Prepare a socket path for binding.
///
/// - Creates parent directories if needed
/// - Fails with `AddrInUse` while another socket is still bound to the path
/// - Removes a stale socket file whose owner is gone
/// - Returns a cleanup guard that removes the socket on drop
pub fn prepare_socket(path: &Path) -> std::io::Result<UdsCleanupGuard> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if path.exists() {
        let peer = StdUnixDatagram::unbound()?;
        match peer.connect(path) {
            Ok(()) => {
                return Err(std::io::Error::new(
                    ErrorKind::AddrInUse,
                    format!("{} is bound by a live socket", path.display()),
                ));
            }
            Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                info!(path = %path.display(), "Removing stale endpoint socket");
                std::fs::remove_file(path)?;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(UdsCleanupGuard::new(path))
}

/// Transport over Unix datagram sockets.
pub struct UdsTransport {
    config: UdsConfig,
    /// Non-blocking socket for `try_send`; every call reaches the kernel.
    nonblocking: StdUnixDatagram,
}

impl UdsTransport {
    pub fn new(config: UdsConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.base_path)?;
        let nonblocking = StdUnixDatagram::unbound()?;
        nonblocking.set_nonblocking(true)?;
        Ok(Self {
            config,
            nonblocking,
        })
    }

    pub fn config(&self) -> &UdsConfig {
        &self.config
    }
}

/// Map socket errors to transport errors for a destination.
fn send_error(to: EndpointId, e: std::io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::ConnectionRefused => TransportError::Unreachable(to),
        ErrorKind::WouldBlock => TransportError::Full(to),
        _ => TransportError::Io(e),
    }
}

fn bind_error(endpoint: EndpointId, e: std::io::Error) -> TransportError {
    match e.kind() {
        ErrorKind::AddrInUse => TransportError::AddressInUse(endpoint),
        _ => TransportError::Io(e),
    }
}

/// Receiving side of a socket endpoint.
pub struct UdsInbox {
    endpoint: EndpointId,
    socket: UnixDatagram,
    _guard: UdsCleanupGuard,
}

#[async_trait]
impl Inbox for UdsInbox {
    fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    async fn recv(&mut self) -> Result<ControlPacket> {
        // One spare byte so oversized datagrams show up as a length mismatch.
        let mut buf = [0u8; FRAME_SIZE + 1];
        let len = self.socket.recv(&mut buf).await?;
        Ok(packet::decode(&buf[..len])?)
    }
}

#[async_trait]
impl Transport for UdsTransport {
    async fn bind(&self, endpoint: EndpointId) -> Result<Box<dyn Inbox>> {
        let path = self.config.socket_path(endpoint);
        let guard = prepare_socket(&path).map_err(|e| bind_error(endpoint, e))?;
        let socket = UnixDatagram::bind(&path).map_err(|e| bind_error(endpoint, e))?;

        debug!(endpoint = %endpoint, path = %path.display(), "Endpoint bound");

        Ok(Box::new(UdsInbox {
            endpoint,
            socket,
            _guard: guard,
        }))
    }

    async fn send(&self, to: EndpointId, packet: &ControlPacket) -> Result<()> {
        let frame = packet::encode(packet);
        // Connected, so the kernel wakes us once a full peer queue drains.
        let socket = UnixDatagram::unbound()?;
        socket
            .connect(self.config.socket_path(to))
            .map_err(|e| send_error(to, e))?;
        socket.send(&frame).await.map_err(|e| send_error(to, e))?;
        Ok(())
    }

    async fn try_send(&self, to: EndpointId, packet: &ControlPacket) -> Result<()> {
        let frame = packet::encode(packet);
        self.nonblocking
            .send_to(&frame, self.config.socket_path(to))
            .map_err(|e| send_error(to, e))?;
        Ok(())
    }
}
