//! Producer handle.

use std::sync::Arc;

use tracing::{debug, info};

use super::{ControlChannel, Result};
use crate::packet::{Body, Category, ClientId, EndpointId, MessageKind};
use crate::transport::Transport;

/// A registered producer owning one category.
pub struct Producer {
    category: Category,
    control: ControlChannel,
}

impl Producer {
    /// Claim `category` at the dispatcher.
    ///
    /// Fails with `ClientError::Rejected` when another producer owns it.
    pub async fn register(
        transport: Arc<dyn Transport>,
        dispatcher: EndpointId,
        id: ClientId,
        category: Category,
        action_endpoint: EndpointId,
    ) -> Result<Self> {
        // Producers receive no notifications; both addresses point at the action endpoint.
        let mut control =
            ControlChannel::open(transport, dispatcher, id, action_endpoint, action_endpoint)
                .await?;
        control
            .request_ack(MessageKind::RegisterProducer, category)
            .await?;

        info!(producer = %id, category = %category, "Producer registered");

        Ok(Self { category, control })
    }

    pub fn id(&self) -> ClientId {
        self.control.client()
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Push a notification; the dispatcher never answers.
    pub async fn notify(&self, text: &str) -> Result<()> {
        let body = Body::new(text)?;
        self.control
            .send(MessageKind::Notify, self.category, body)
            .await?;
        debug!(category = %self.category, "Notification sent");
        Ok(())
    }
}
