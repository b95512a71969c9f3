//! Message definitions for the broker
//!
//! A `Message` is a published payload plus its acknowledgment bookkeeping.
//! It is owned by its topic's durable queue and shared by reference (`Arc`)
//! with the private queue of every subscriber responsible for delivering it.
//!
//! Notes on fields:
//! - `id`: opaque id, unique within a topic while the message is retained
//! - `payload`: the body as published, forwarded untouched
//! - `created_at`: set when the message is constructed; drives the TTL
//! - `acks`: subscriber address -> acknowledged. An address is present iff
//!   that subscriber is, or was, responsible for delivering this message.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

#[derive(Debug)]
pub struct Message {
    pub id: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    acks: Mutex<HashMap<String, bool>>,
}

impl Message {
    pub fn new(id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::with_created_at(id, payload, Utc::now())
    }

    pub(crate) fn with_created_at(
        id: impl Into<String>,
        payload: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            payload: payload.into(),
            created_at,
            acks: Mutex::new(HashMap::new()),
        }
    }

    /// Registers `address` as responsible for this message, unacknowledged.
    ///
    /// An existing entry is left as is. Returns `true` if the entry was new.
    pub fn add_subscriber(&self, address: &str) -> bool {
        let mut acks = self.acks.lock();
        if acks.contains_key(address) {
            return false;
        }
        acks.insert(address.to_string(), false);
        true
    }

    /// Marks the message delivered to `address`. Unknown addresses are ignored.
    pub fn ack(&self, address: &str) {
        if let Some(acked) = self.acks.lock().get_mut(address) {
            *acked = true;
        }
    }

    pub fn remove_subscriber(&self, address: &str) {
        self.acks.lock().remove(address);
    }

    /// `None` if `address` was never registered on this message.
    pub fn is_acked_by(&self, address: &str) -> Option<bool> {
        self.acks.lock().get(address).copied()
    }

    pub fn subscriber_count(&self) -> usize {
        self.acks.lock().len()
    }

    pub fn age(&self) -> TimeDelta {
        Utc::now() - self.created_at
    }

    /// True once every registered subscriber has acknowledged and the message
    /// is at least `ttl` old. An empty ack map counts as fully acknowledged.
    pub fn safe_to_delete(&self, ttl: Duration) -> bool {
        let all_acked = self.acks.lock().values().all(|acked| *acked);
        if !all_acked {
            return false;
        }

        match TimeDelta::from_std(ttl) {
            Ok(ttl) => self.age() >= ttl,
            // a ttl too large to represent is never reached
            Err(_) => false,
        }
    }
}
