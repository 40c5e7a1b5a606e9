//! Control packet model.
//!
//! A [`ControlPacket`] is the single unit exchanged between clients and the
//! dispatcher: requests, responses and notifications all share the same
//! fixed-size shape. See [`codec`] for the on-the-wire layout.

pub mod codec;
pub mod listing;

use std::fmt;

use serde::Deserialize;

pub use codec::{decode, encode, FRAME_SIZE};
pub use listing::CategoryListing;

/// Capacity of the body buffer on the wire, including the NUL terminator.
pub const BODY_CAPACITY: usize = 512;

/// Longest text a body can carry.
pub const MAX_BODY_LEN: usize = BODY_CAPACITY - 1;

/// Sender identity used by the dispatcher for packets it originates.
pub const DISPATCHER_ID: ClientId = ClientId(0);

/// Result type for packet operations.
pub type Result<T> = std::result::Result<T, PacketError>;

/// Errors raised while building or decoding packets.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("Body of {len} bytes exceeds the {max} byte limit")]
    BodyTooLarge { len: usize, max: usize },

    #[error("Body contains a NUL byte at offset {offset}")]
    InteriorNul { offset: usize },

    #[error("Malformed frame: expected {expected} bytes, got {actual}")]
    Malformed { expected: usize, actual: usize },
}

/// Integer-identified notification topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(pub i32);

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a producer or subscriber as it appears in `senderId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ClientId(pub i32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Address the transport can deliver a packet to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(pub u32);

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Packet kind tag.
///
/// Codes are a deployment-wide convention shared by every party talking to
/// one dispatcher. Codes nobody agreed on survive decoding as `Unknown` so the
/// dispatcher can reject them explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    RegisterProducer,
    RegisterConsumer,
    Ack,
    Nack,
    Subscribe,
    Unsubscribe,
    ListAvailableCategories,
    ListSubscriptions,
    Notify,
    Unknown(i32),
}

impl MessageKind {
    /// Wire code for this kind.
    pub fn code(self) -> i32 {
        match self {
            Self::RegisterProducer => 100,
            Self::RegisterConsumer => 200,
            Self::Ack => 300,
            Self::Nack => 400,
            Self::Subscribe => 500,
            Self::Unsubscribe => 510,
            Self::ListAvailableCategories => 550,
            Self::ListSubscriptions => 560,
            Self::Notify => 600,
            Self::Unknown(code) => code,
        }
    }

    /// Kind for a wire code.
    pub fn from_code(code: i32) -> Self {
        match code {
            100 => Self::RegisterProducer,
            200 => Self::RegisterConsumer,
            300 => Self::Ack,
            400 => Self::Nack,
            500 => Self::Subscribe,
            510 => Self::Unsubscribe,
            550 => Self::ListAvailableCategories,
            560 => Self::ListSubscriptions,
            600 => Self::Notify,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Unknown({})", code),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Bounded text payload.
///
/// Holds at most [`MAX_BODY_LEN`] bytes and no NUL, so it always fits the
/// wire buffer with its terminator and decodes back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Body(String);

impl Body {
    /// Build a body, rejecting text that does not fit or contains a NUL.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.len() > MAX_BODY_LEN {
            return Err(PacketError::BodyTooLarge {
                len: text.len(),
                max: MAX_BODY_LEN,
            });
        }
        if let Some(offset) = text.find('\0') {
            return Err(PacketError::InteriorNul { offset });
        }
        Ok(Self(text))
    }

    /// Build a body from the text before the first NUL, cut at the last char
    /// boundary that fits.
    pub fn truncated(text: &str) -> Self {
        let text = text.split('\0').next().unwrap_or_default();
        if text.len() <= MAX_BODY_LEN {
            return Self(text.to_string());
        }
        let mut end = MAX_BODY_LEN;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Self(text[..end].to_string())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unit of request/response/notification exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlPacket {
    pub kind: MessageKind,
    pub body: Body,
    pub sender: ClientId,
    pub category: Category,
    /// Where asynchronous notifications for the sender land.
    pub notification_endpoint: EndpointId,
    /// Where synchronous responses to the sender's requests land.
    pub action_endpoint: EndpointId,
}

impl ControlPacket {
    /// Bare packet of the given kind; remaining fields zeroed.
    pub fn new(kind: MessageKind, sender: ClientId) -> Self {
        Self {
            kind,
            body: Body::empty(),
            sender,
            category: Category(0),
            notification_endpoint: EndpointId::default(),
            action_endpoint: EndpointId::default(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn with_endpoints(mut self, notification: EndpointId, action: EndpointId) -> Self {
        self.notification_endpoint = notification;
        self.action_endpoint = action;
        self
    }

    /// Positive acknowledgement from the dispatcher.
    pub fn ack(category: Category) -> Self {
        Self::new(MessageKind::Ack, DISPATCHER_ID).with_category(category)
    }

    /// Negative acknowledgement carrying a human-readable reason.
    pub fn nack(category: Category, reason: &str) -> Self {
        Self::new(MessageKind::Nack, DISPATCHER_ID)
            .with_category(category)
            .with_body(Body::truncated(reason))
    }

    /// Notification copy as delivered to one subscriber.
    pub fn notification(category: Category, body: Body) -> Self {
        Self::new(MessageKind::Notify, DISPATCHER_ID)
            .with_category(category)
            .with_body(body)
    }
}

#[cfg(test)]
mod tests;
