//! In-memory channel transport for standalone mode.
//!
//! Every bound endpoint owns a bounded tokio mpsc queue. Senders look the
//! queue up by endpoint id; a dropped inbox makes its endpoint unreachable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use super::{Inbox, Result, Transport, TransportError};
use crate::packet::{ControlPacket, EndpointId};

/// In-process transport backed by one bounded queue per endpoint.
#[derive(Clone)]
pub struct ChannelTransport {
    capacity: usize,
    endpoints: Arc<RwLock<HashMap<EndpointId, mpsc::Sender<ControlPacket>>>>,
}

impl ChannelTransport {
    /// Create a transport whose queues hold `capacity` packets each.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            endpoints: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Tear an endpoint down.
    ///
    /// Packets already queued are still handed out; afterwards the inbox
    /// reports `Closed`.
    pub async fn unbind(&self, endpoint: EndpointId) {
        if self.endpoints.write().await.remove(&endpoint).is_some() {
            info!(endpoint = %endpoint, "Endpoint torn down");
        }
    }

    /// Whether an endpoint currently has a live inbox.
    pub async fn is_bound(&self, endpoint: EndpointId) -> bool {
        self.endpoints
            .read()
            .await
            .get(&endpoint)
            .map(|sender| !sender.is_closed())
            .unwrap_or(false)
    }

    async fn sender_for(&self, to: EndpointId) -> Result<mpsc::Sender<ControlPacket>> {
        let endpoints = self.endpoints.read().await;
        match endpoints.get(&to) {
            Some(sender) if !sender.is_closed() => Ok(sender.clone()),
            _ => Err(TransportError::Unreachable(to)),
        }
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new(super::ChannelConfig::default().capacity)
    }
}

/// Receiving side of a channel endpoint.
pub struct ChannelInbox {
    endpoint: EndpointId,
    receiver: mpsc::Receiver<ControlPacket>,
}

#[async_trait]
impl Inbox for ChannelInbox {
    fn endpoint(&self) -> EndpointId {
        self.endpoint
    }

    async fn recv(&mut self) -> Result<ControlPacket> {
        self.receiver
            .recv()
            .await
            .ok_or(TransportError::Closed(self.endpoint))
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn bind(&self, endpoint: EndpointId) -> Result<Box<dyn Inbox>> {
        let mut endpoints = self.endpoints.write().await;
        if let Some(existing) = endpoints.get(&endpoint) {
            if !existing.is_closed() {
                return Err(TransportError::AddressInUse(endpoint));
            }
        }

        let (sender, receiver) = mpsc::channel(self.capacity);
        endpoints.insert(endpoint, sender);

        debug!(endpoint = %endpoint, capacity = self.capacity, "Endpoint bound");

        Ok(Box::new(ChannelInbox { endpoint, receiver }))
    }

    async fn send(&self, to: EndpointId, packet: &ControlPacket) -> Result<()> {
        let sender = self.sender_for(to).await?;
        sender
            .send(packet.clone())
            .await
            .map_err(|_| TransportError::Unreachable(to))
    }

    async fn try_send(&self, to: EndpointId, packet: &ControlPacket) -> Result<()> {
        let sender = self.sender_for(to).await?;
        sender.try_send(packet.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Full(to),
            mpsc::error::TrySendError::Closed(_) => TransportError::Unreachable(to),
        })
    }
}

#[cfg(test)]
mod tests;
