//! Dispatcher loop.
//!
//! The single control point of the system. It owns both registries, pulls
//! control packets off its well-known endpoint one at a time, mutates the
//! registries, and answers on the sender's action endpoint or fans a
//! notification out to subscribers.
//!
//! ```text
//! producer/consumer ──▶ [well-known endpoint] ──▶ Dispatcher
//!                                                   │  ├─ CategoryRegistry
//!                                                   │  └─ SubscriptionRegistry
//!                         ┌─────────────────────────┤
//!                         ▼                         ▼
//!                  action endpoint        notification endpoints
//!                   (Ack / Nack)              (Notify fan-out)
//! ```

mod fanout;

use std::future::Future;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::packet::listing::{self, CategoryListing};
use crate::packet::{Body, Category, ControlPacket, EndpointId, MessageKind, DISPATCHER_ID};
use crate::registry::{
    CategoryRegistry, RegisterOutcome, SubscribeOutcome, SubscriptionRegistry, UnsubscribeOutcome,
};
use crate::transport::{Inbox, Transport, TransportError};

pub use fanout::FanOutReport;

/// Nack reasons sent back to clients.
pub mod reasons {
    pub const CATEGORY_EXISTS: &str = "category exists";
    pub const NONE_AVAILABLE: &str = "none available";
    pub const NONE_SUBSCRIBED: &str = "none subscribed";
    pub const NOT_FOUND: &str = "not found";
    pub const ALREADY_SUBSCRIBED: &str = "already subscribed";
    pub const UNKNOWN_TYPE: &str = "unknown type";
}

/// Default well-known endpoint of the dispatcher.
pub const DEFAULT_ENDPOINT: EndpointId = EndpointId(42);

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors that stop the dispatcher.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to bind dispatcher endpoint {endpoint}: {source}")]
    Bind {
        endpoint: EndpointId,
        #[source]
        source: TransportError,
    },

    #[error("Failed to receive next control packet: {0}")]
    Receive(#[source] TransportError),
}

// ============================================================================
// Configuration
// ============================================================================

/// How responses and notifications are handed to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendPolicy {
    /// Wait for room at the destination; a full subscriber stalls the loop.
    #[default]
    Blocking,
    /// Never wait; drop the packet and log when the destination is full.
    DropOnFull,
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Well-known endpoint every client sends requests to.
    pub endpoint: EndpointId,
    /// Send policy for responses and notifications.
    pub send_policy: SendPolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT,
            send_policy: SendPolicy::Blocking,
        }
    }
}

impl DispatcherConfig {
    pub fn with_endpoint(mut self, endpoint: EndpointId) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_send_policy(mut self, send_policy: SendPolicy) -> Self {
        self.send_policy = send_policy;
        self
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// What the dispatcher does after classifying a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a synchronous response.
    Respond { to: EndpointId, packet: ControlPacket },
    /// Deliver a notification to every subscriber of a category.
    Distribute { category: Category, body: Body },
}

/// Category broker owning the producer and subscriber registries.
pub struct Dispatcher {
    config: DispatcherConfig,
    transport: Arc<dyn Transport>,
    inbox: Box<dyn Inbox>,
    categories: CategoryRegistry,
    subscriptions: SubscriptionRegistry,
}

impl Dispatcher {
    /// Bind the well-known endpoint and create an empty dispatcher.
    pub async fn bind(transport: Arc<dyn Transport>, config: DispatcherConfig) -> Result<Self> {
        let inbox = transport
            .bind(config.endpoint)
            .await
            .map_err(|source| DispatchError::Bind {
                endpoint: config.endpoint,
                source,
            })?;

        info!(
            endpoint = %config.endpoint,
            send_policy = ?config.send_policy,
            "Dispatcher bound"
        );

        Ok(Self {
            config,
            transport,
            inbox,
            categories: CategoryRegistry::new(),
            subscriptions: SubscriptionRegistry::new(),
        })
    }

    pub fn endpoint(&self) -> EndpointId {
        self.config.endpoint
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn categories(&self) -> &CategoryRegistry {
        &self.categories
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    /// Process packets until receiving fails.
    ///
    /// Never returns `Ok`: the only way out is a receive failure, which is
    /// fatal because no further progress is possible.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }

    /// Process packets until `shutdown` resolves or receiving fails.
    ///
    /// A packet already being handled is finished before shutdown is observed.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            let packet = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Dispatcher shutting down");
                    return Ok(());
                }
                received = self.receive() => received?,
            };
            self.handle(packet).await;
        }
    }

    /// Receive and fully process one packet.
    pub async fn step(&mut self) -> Result<()> {
        let packet = self.receive().await?;
        self.handle(packet).await;
        Ok(())
    }

    /// Next packet from the inbox.
    ///
    /// A torn-down endpoint and a frame of the wrong size are both fatal.
    async fn receive(&mut self) -> Result<ControlPacket> {
        self.inbox.recv().await.map_err(|e| {
            error!(error = %e, "Dispatcher inbox failed");
            DispatchError::Receive(e)
        })
    }

    /// Classify a packet and carry out the resulting action.
    #[tracing::instrument(
        name = "dispatcher.handle",
        skip_all,
        fields(kind = %packet.kind, sender = %packet.sender, category = %packet.category)
    )]
    pub async fn handle(&mut self, packet: ControlPacket) {
        match self.classify(&packet) {
            Action::Respond { to, packet } => self.respond(to, &packet).await,
            Action::Distribute { category, body } => {
                self.distribute(category, &body).await;
            }
        }
    }

    /// Apply a packet to the registries and decide what to send.
    pub fn classify(&mut self, packet: &ControlPacket) -> Action {
        let reply_to = packet.action_endpoint;
        let category = packet.category;

        let response = match packet.kind {
            MessageKind::RegisterProducer => {
                match self.categories.register(packet.sender, category) {
                    RegisterOutcome::Accepted => {
                        info!(producer = %packet.sender, category = %category, "Producer registered");
                        ControlPacket::ack(category)
                    }
                    RegisterOutcome::AlreadyExists { owner } => {
                        warn!(
                            producer = %packet.sender,
                            owner = %owner,
                            category = %category,
                            "Category already registered"
                        );
                        ControlPacket::nack(category, reasons::CATEGORY_EXISTS)
                    }
                }
            }
            MessageKind::RegisterConsumer => {
                info!(consumer = %packet.sender, "Consumer registered");
                ControlPacket::ack(category)
            }
            MessageKind::ListAvailableCategories => {
                let listings: Vec<CategoryListing> = self
                    .categories
                    .list_all()
                    .into_iter()
                    .map(|r| CategoryListing {
                        producer: r.producer,
                        category: r.category,
                    })
                    .collect();
                if listings.is_empty() {
                    ControlPacket::nack(category, reasons::NONE_AVAILABLE)
                } else {
                    let rendered = listing::render_categories(&listings);
                    if rendered.omitted > 0 {
                        warn!(omitted = rendered.omitted, "Category listing truncated");
                    }
                    ControlPacket::new(MessageKind::ListAvailableCategories, DISPATCHER_ID)
                        .with_body(rendered.body)
                }
            }
            MessageKind::ListSubscriptions => {
                let categories = self.subscriptions.categories_of(packet.sender);
                if categories.is_empty() {
                    ControlPacket::nack(category, reasons::NONE_SUBSCRIBED)
                } else {
                    let rendered = listing::render_subscriptions(&categories);
                    if rendered.omitted > 0 {
                        warn!(
                            subscriber = %packet.sender,
                            omitted = rendered.omitted,
                            "Subscription listing truncated"
                        );
                    }
                    ControlPacket::new(MessageKind::ListSubscriptions, DISPATCHER_ID)
                        .with_body(rendered.body)
                }
            }
            MessageKind::Subscribe => {
                match self.subscriptions.subscribe(
                    packet.sender,
                    category,
                    packet.notification_endpoint,
                ) {
                    SubscribeOutcome::Accepted => {
                        info!(
                            subscriber = %packet.sender,
                            category = %category,
                            endpoint = %packet.notification_endpoint,
                            "Subscriber added"
                        );
                        ControlPacket::ack(category)
                    }
                    SubscribeOutcome::AlreadySubscribed { endpoint } => {
                        warn!(
                            subscriber = %packet.sender,
                            category = %category,
                            endpoint = %endpoint,
                            "Duplicate subscription rejected"
                        );
                        ControlPacket::nack(category, reasons::ALREADY_SUBSCRIBED)
                    }
                }
            }
            MessageKind::Unsubscribe => {
                match self.subscriptions.unsubscribe(packet.sender, category) {
                    UnsubscribeOutcome::Removed => {
                        info!(subscriber = %packet.sender, category = %category, "Subscriber removed");
                        ControlPacket::ack(category)
                    }
                    UnsubscribeOutcome::NotFound => {
                        info!(
                            subscriber = %packet.sender,
                            category = %category,
                            "No matching subscription"
                        );
                        ControlPacket::nack(category, reasons::NOT_FOUND)
                    }
                }
            }
            MessageKind::Notify => {
                if self.categories.owner(category) != Some(packet.sender) {
                    debug!(
                        sender = %packet.sender,
                        category = %category,
                        "Notification from non-owner of category"
                    );
                }
                return Action::Distribute {
                    category,
                    body: packet.body.clone(),
                };
            }
            MessageKind::Ack | MessageKind::Nack | MessageKind::Unknown(_) => {
                warn!(kind = %packet.kind, sender = %packet.sender, "Unrecognized message type");
                ControlPacket::nack(category, reasons::UNKNOWN_TYPE)
            }
        };

        Action::Respond {
            to: reply_to,
            packet: response,
        }
    }

    /// Send a response; failures are logged and swallowed.
    async fn respond(&self, to: EndpointId, packet: &ControlPacket) {
        match self.deliver(to, packet).await {
            Ok(()) => debug!(endpoint = %to, kind = %packet.kind, "Response sent"),
            Err(e) => warn!(endpoint = %to, kind = %packet.kind, error = %e, "Failed to send response"),
        }
    }

    /// Hand a packet to the transport according to the send policy.
    pub(crate) async fn deliver(
        &self,
        to: EndpointId,
        packet: &ControlPacket,
    ) -> std::result::Result<(), TransportError> {
        match self.config.send_policy {
            SendPolicy::Blocking => self.transport.send(to, packet).await,
            SendPolicy::DropOnFull => self.transport.try_send(to, packet).await,
        }
    }
}
