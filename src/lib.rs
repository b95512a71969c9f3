//! # PushSub
//!
//! `pushsub` is an in-memory, topic-based publish/subscribe broker. Producers
//! publish messages to named topics; subscribers register an HTTP endpoint
//! per topic and receive pushed deliveries with retry and at-least-once
//! acknowledgment tracking.
//!
//! ## Core Modules
//!
//! - `broker`: topics, message queues, deduplication, fan-out, per-subscriber
//!   delivery loops and the periodic reclamation sweeps.
//! - `client`: a helper for publishing and (un)subscribing over the front door.
//! - `config`: loads server, delivery and retention settings.
//! - `transport`: the WebSocket front door and its JSON protocol.
//! - `utils`: shared error type and logging setup.

pub mod broker;
pub mod client;
pub mod config;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
