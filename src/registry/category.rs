//! Category registry - which categories have a producer.

use std::collections::HashMap;

use crate::packet::{Category, ClientId};

/// A category claimed by its producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProducerRecord {
    pub producer: ClientId,
    pub category: Category,
}

/// Outcome of a category registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Accepted,
    /// Category already owned; `owner` is the producer holding it.
    AlreadyExists { owner: ClientId },
}

/// Categories with an active producer.
///
/// A category, once claimed, stays claimed for the registry's lifetime.
/// Listing follows registration order.
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    owners: HashMap<Category, ClientId>,
    order: Vec<Category>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `category` for `producer` unless someone already holds it.
    pub fn register(&mut self, producer: ClientId, category: Category) -> RegisterOutcome {
        if let Some(owner) = self.owners.get(&category) {
            return RegisterOutcome::AlreadyExists { owner: *owner };
        }
        self.owners.insert(category, producer);
        self.order.push(category);
        RegisterOutcome::Accepted
    }

    pub fn exists(&self, category: Category) -> bool {
        self.owners.contains_key(&category)
    }

    /// Producer owning `category`, if any.
    pub fn owner(&self, category: Category) -> Option<ClientId> {
        self.owners.get(&category).copied()
    }

    /// Snapshot of all producer records in registration order.
    pub fn list_all(&self) -> Vec<ProducerRecord> {
        self.order
            .iter()
            .map(|category| ProducerRecord {
                producer: self.owners[category],
                category: *category,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
