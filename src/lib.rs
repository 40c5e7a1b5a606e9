//! Catbus - category-based publish/subscribe dispatcher
//!
//! A single dispatcher brokers notifications between producers, each owning
//! one category, and consumers subscribed to any number of categories. All
//! traffic travels as fixed-size control packets over a pluggable transport.

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod packet;
pub mod registry;
pub mod transport;
pub mod utils;
