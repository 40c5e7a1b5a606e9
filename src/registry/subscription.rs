//! Subscription registry - who receives which category, and where.

use std::collections::HashMap;

use crate::packet::{Category, ClientId, EndpointId};

/// One subscriber's interest in one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriberRecord {
    pub subscriber: ClientId,
    pub category: Category,
    pub endpoint: EndpointId,
}

/// Outcome of a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    Accepted,
    /// The pair is already subscribed; the existing record is kept as is.
    AlreadySubscribed { endpoint: EndpointId },
}

/// Outcome of an unsubscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeOutcome {
    Removed,
    NotFound,
}

/// Subscriptions keyed by `(subscriber, category)`.
///
/// Two ordered indexes sit next to the keyed map so both per-category
/// fan-out and per-subscriber listing follow subscription order.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    endpoints: HashMap<(ClientId, Category), EndpointId>,
    by_category: HashMap<Category, Vec<ClientId>>,
    by_subscriber: HashMap<ClientId, Vec<Category>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `subscriber` wants `category` delivered to `endpoint`.
    ///
    /// A pair can hold only one record; repeats leave the registry untouched.
    pub fn subscribe(
        &mut self,
        subscriber: ClientId,
        category: Category,
        endpoint: EndpointId,
    ) -> SubscribeOutcome {
        if let Some(existing) = self.endpoints.get(&(subscriber, category)) {
            return SubscribeOutcome::AlreadySubscribed {
                endpoint: *existing,
            };
        }

        self.endpoints.insert((subscriber, category), endpoint);
        self.by_category.entry(category).or_default().push(subscriber);
        self.by_subscriber.entry(subscriber).or_default().push(category);
        SubscribeOutcome::Accepted
    }

    /// Drop the record for `(subscriber, category)`.
    pub fn unsubscribe(&mut self, subscriber: ClientId, category: Category) -> UnsubscribeOutcome {
        if self.endpoints.remove(&(subscriber, category)).is_none() {
            return UnsubscribeOutcome::NotFound;
        }

        remove_first(&mut self.by_category, category, subscriber);
        remove_first(&mut self.by_subscriber, subscriber, category);
        UnsubscribeOutcome::Removed
    }

    pub fn is_subscribed(&self, subscriber: ClientId, category: Category) -> bool {
        self.endpoints.contains_key(&(subscriber, category))
    }

    /// Records for `category` in subscription order.
    pub fn subscribers_of(&self, category: Category) -> Vec<SubscriberRecord> {
        self.by_category
            .get(&category)
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|subscriber| SubscriberRecord {
                        subscriber: *subscriber,
                        category,
                        endpoint: self.endpoints[&(*subscriber, category)],
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Categories `subscriber` is subscribed to, in subscription order.
    pub fn categories_of(&self, subscriber: ClientId) -> Vec<Category> {
        self.by_subscriber
            .get(&subscriber)
            .cloned()
            .unwrap_or_default()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

/// Remove the first occurrence of `value` under `key`, dropping emptied lists.
fn remove_first<K, V>(index: &mut HashMap<K, Vec<V>>, key: K, value: V)
where
    K: std::hash::Hash + Eq,
    V: PartialEq,
{
    if let Some(values) = index.get_mut(&key) {
        if let Some(pos) = values.iter().position(|v| *v == value) {
            values.remove(pos);
        }
        if values.is_empty() {
            index.remove(&key);
        }
    }
}
