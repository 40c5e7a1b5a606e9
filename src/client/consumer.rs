//! Consumer handle.
//!
//! Two independent suspension points: control requests block on the action
//! endpoint, while a spawned task blocks on the notification endpoint and
//! forwards every notification into a stream.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use super::{expect_ack, ClientError, ControlChannel, Result};
use crate::dispatcher::reasons;
use crate::packet::listing::{self, CategoryListing};
use crate::packet::{Body, Category, ClientId, EndpointId, MessageKind};
use crate::transport::{Inbox, Transport, TransportError};

/// Buffered notifications between the receive task and the stream.
const NOTIFICATION_BUFFER: usize = 256;

/// Notification as seen by a consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub category: Category,
    pub body: Body,
}

/// Stream of notifications delivered to a consumer.
pub type Notifications = ReceiverStream<Notification>;

/// The two addresses a consumer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerEndpoints {
    pub action: EndpointId,
    pub notification: EndpointId,
}

/// A registered consumer.
pub struct Consumer {
    control: ControlChannel,
    notifications: Option<Notifications>,
    receiver_task: JoinHandle<()>,
}

impl Consumer {
    /// Bind both endpoints, start the notification task and register.
    pub async fn register(
        transport: Arc<dyn Transport>,
        dispatcher: EndpointId,
        id: ClientId,
        endpoints: ConsumerEndpoints,
    ) -> Result<Self> {
        let inbox = transport.bind(endpoints.notification).await?;
        let control = ControlChannel::open(
            transport,
            dispatcher,
            id,
            endpoints.action,
            endpoints.notification,
        )
        .await?;

        let (sender, receiver) = mpsc::channel(NOTIFICATION_BUFFER);
        let receiver_task = tokio::spawn(receive_notifications(id, inbox, sender));

        // Registration failure drops the consumer, which stops the task.
        let mut consumer = Self {
            control,
            notifications: Some(ReceiverStream::new(receiver)),
            receiver_task,
        };
        consumer
            .control
            .request_ack(MessageKind::RegisterConsumer, Category(0))
            .await?;

        info!(
            consumer = %id,
            action = %endpoints.action,
            notification = %endpoints.notification,
            "Consumer registered"
        );

        Ok(consumer)
    }

    pub fn id(&self) -> ClientId {
        self.control.client()
    }

    /// Take the notification stream; `None` once taken.
    pub fn notifications(&mut self) -> Option<Notifications> {
        self.notifications.take()
    }

    /// Categories that currently have a producer.
    pub async fn available_categories(&mut self) -> Result<Vec<CategoryListing>> {
        let response = self
            .control
            .request(MessageKind::ListAvailableCategories, Category(0), Body::empty())
            .await?;
        match response.kind {
            MessageKind::ListAvailableCategories => Ok(listing::parse_categories(&response.body)),
            MessageKind::Nack if response.body.as_str() == reasons::NONE_AVAILABLE => Ok(Vec::new()),
            MessageKind::Nack => Err(ClientError::Rejected(response.body.to_string())),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    /// Categories this consumer is subscribed to.
    pub async fn subscriptions(&mut self) -> Result<Vec<Category>> {
        let response = self
            .control
            .request(MessageKind::ListSubscriptions, Category(0), Body::empty())
            .await?;
        match response.kind {
            MessageKind::ListSubscriptions => Ok(listing::parse_subscriptions(&response.body)),
            MessageKind::Nack if response.body.as_str() == reasons::NONE_SUBSCRIBED => {
                Ok(Vec::new())
            }
            MessageKind::Nack => Err(ClientError::Rejected(response.body.to_string())),
            other => Err(ClientError::UnexpectedResponse(other)),
        }
    }

    pub async fn subscribe(&mut self, category: Category) -> Result<()> {
        let response = self
            .control
            .request(MessageKind::Subscribe, category, Body::empty())
            .await?;
        expect_ack(response)?;
        info!(consumer = %self.id(), category = %category, "Subscribed");
        Ok(())
    }

    pub async fn unsubscribe(&mut self, category: Category) -> Result<()> {
        let response = self
            .control
            .request(MessageKind::Unsubscribe, category, Body::empty())
            .await?;
        expect_ack(response)?;
        info!(consumer = %self.id(), category = %category, "Unsubscribed");
        Ok(())
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        self.receiver_task.abort();
    }
}

/// Drain the notification endpoint until it is torn down or nobody listens.
async fn receive_notifications(
    consumer: ClientId,
    mut inbox: Box<dyn Inbox>,
    sender: mpsc::Sender<Notification>,
) {
    loop {
        let packet = match inbox.recv().await {
            Ok(packet) => packet,
            Err(TransportError::Closed(endpoint)) => {
                info!(consumer = %consumer, endpoint = %endpoint, "Notification endpoint closed");
                break;
            }
            Err(TransportError::Packet(e)) => {
                warn!(consumer = %consumer, error = %e, "Dropping malformed notification");
                continue;
            }
            Err(e) => {
                warn!(consumer = %consumer, error = %e, "Notification receive failed");
                break;
            }
        };

        if packet.kind != MessageKind::Notify {
            debug!(
                consumer = %consumer,
                kind = %packet.kind,
                "Ignoring non-notification on notification endpoint"
            );
            continue;
        }

        let notification = Notification {
            category: packet.category,
            body: packet.body,
        };
        if sender.send(notification).await.is_err() {
            debug!(consumer = %consumer, "Notification stream dropped");
            break;
        }
    }
}
