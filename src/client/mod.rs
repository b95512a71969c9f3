//! The `client` module provides a helper for talking to the broker's
//! WebSocket front door: publishing, subscribing and unsubscribing.
//!
//! Subscriber endpoints receive deliveries as HTTP POSTs whose body decodes
//! as [`DeliveryPayload`](crate::broker::DeliveryPayload).

pub mod pubsub_client;
pub use pubsub_client::BrokerClient;

#[cfg(test)]
mod tests;
