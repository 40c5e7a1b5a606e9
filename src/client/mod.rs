//! Client handles for producers and consumers.
//!
//! Every client talks to the dispatcher through a [`ControlChannel`]: requests
//! go to the dispatcher's well-known endpoint and the single response comes
//! back on the client's own action endpoint. Consumers additionally own a
//! notification endpoint that a background task drains, so waiting for
//! notifications never swallows a control response.

mod consumer;
mod producer;

use std::sync::Arc;

use tracing::debug;

use crate::packet::{
    Body, Category, ClientId, ControlPacket, EndpointId, MessageKind, PacketError,
};
use crate::transport::{Inbox, Transport, TransportError};

pub use consumer::{Consumer, ConsumerEndpoints, Notification, Notifications};
pub use producer::Producer;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to client code.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Dispatcher rejected request: {0}")]
    Rejected(String),

    #[error("Unexpected response type: {0}")]
    UnexpectedResponse(MessageKind),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid packet: {0}")]
    Packet(#[from] PacketError),
}

/// Request/response channel to the dispatcher.
pub struct ControlChannel {
    transport: Arc<dyn Transport>,
    dispatcher: EndpointId,
    client: ClientId,
    action: Box<dyn Inbox>,
    notification_endpoint: EndpointId,
}

impl ControlChannel {
    /// Bind `action_endpoint` for responses.
    ///
    /// `notification_endpoint` is only advertised in outgoing packets; whoever
    /// consumes notifications binds it.
    pub async fn open(
        transport: Arc<dyn Transport>,
        dispatcher: EndpointId,
        client: ClientId,
        action_endpoint: EndpointId,
        notification_endpoint: EndpointId,
    ) -> Result<Self> {
        let action = transport.bind(action_endpoint).await?;
        Ok(Self {
            transport,
            dispatcher,
            client,
            action,
            notification_endpoint,
        })
    }

    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn action_endpoint(&self) -> EndpointId {
        self.action.endpoint()
    }

    pub fn notification_endpoint(&self) -> EndpointId {
        self.notification_endpoint
    }

    fn packet(&self, kind: MessageKind, category: Category, body: Body) -> ControlPacket {
        ControlPacket::new(kind, self.client)
            .with_category(category)
            .with_body(body)
            .with_endpoints(self.notification_endpoint, self.action.endpoint())
    }

    /// Send a packet that gets no response.
    pub async fn send(&self, kind: MessageKind, category: Category, body: Body) -> Result<()> {
        let packet = self.packet(kind, category, body);
        self.transport.send(self.dispatcher, &packet).await?;
        Ok(())
    }

    /// Send a request and wait for its response.
    pub async fn request(
        &mut self,
        kind: MessageKind,
        category: Category,
        body: Body,
    ) -> Result<ControlPacket> {
        let packet = self.packet(kind, category, body);
        self.transport.send(self.dispatcher, &packet).await?;
        let response = self.action.recv().await?;
        debug!(
            request = %kind,
            response = %response.kind,
            category = %category,
            "Dispatcher responded"
        );
        Ok(response)
    }

    /// Send a request that must be answered with `Ack`.
    pub async fn request_ack(&mut self, kind: MessageKind, category: Category) -> Result<()> {
        let response = self.request(kind, category, Body::empty()).await?;
        expect_ack(response)
    }
}

/// Map an `Ack`/`Nack` response to a result.
pub(crate) fn expect_ack(response: ControlPacket) -> Result<()> {
    match response.kind {
        MessageKind::Ack => Ok(()),
        MessageKind::Nack => Err(ClientError::Rejected(response.body.to_string())),
        other => Err(ClientError::UnexpectedResponse(other)),
    }
}
