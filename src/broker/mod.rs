//! The broker core: topics, their message queues, and per-subscriber
//! delivery loops.
//!
//! Control flow: `Broker::publish` -> `Topic::publish` (dedup, bounded
//! intake) -> the topic's dispatch loop copies the message reference into
//! every subscriber's private queue -> each subscriber's delivery loop pushes
//! it with retry and acknowledges it on success.

pub mod delivery;
pub mod engine;
pub mod message;
pub mod queue;
pub mod subscriber;
pub mod topic;

pub use delivery::{DeliveryConfig, DeliveryPayload, HttpPusher, Pusher};
pub use engine::{Broker, BrokerConfig};
pub use message::Message;
pub use queue::MessageQueue;
pub use subscriber::{DeliveryOutcome, Subscriber};
pub use topic::{PublishOutcome, Topic};
