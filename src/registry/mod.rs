//! Producer and subscriber registries.
//!
//! Both registries are plain owned state with no interior locking: the
//! dispatcher owns them and mutates them one packet at a time. Operations
//! never fail; they report what happened through outcome enums that the
//! dispatcher maps onto `Ack`/`Nack`.

mod category;
mod subscription;

pub use category::{CategoryRegistry, ProducerRecord, RegisterOutcome};
pub use subscription::{SubscribeOutcome, SubscriberRecord, SubscriptionRegistry, UnsubscribeOutcome};
