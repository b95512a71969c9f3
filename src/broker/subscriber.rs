//! Subscriber delivery state
//!
//! A `Subscriber` is one remote endpoint on one topic: its private queue of
//! pending messages, its liveness flag, the time of its last activity and the
//! cancellation token of its delivery loop.
//!
//! Lifecycle: `active` <-> `inactive` -> reclaimed. `unsubscribe` and
//! delivery exhaustion only flip `active` off; the cleanup sweep is what
//! cancels the loop and drops the subscriber. Reactivation happens in place
//! and always cancels the previous loop before a new one is launched, so at
//! most one loop runs per subscriber.
//!
//! Lock order: topic lock, then subscriber state, then message ack map.
//! The queue lock is innermost. None of them is held across a push.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::broker::delivery::{DeliveryConfig, DeliveryPayload, Pusher};
use crate::broker::message::Message;
use crate::broker::queue::MessageQueue;

#[derive(Debug)]
struct SubscriberState {
    active: bool,
    last_active: DateTime<Utc>,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct Subscriber {
    pub address: String,
    pub queue: MessageQueue,
    state: Mutex<SubscriberState>,
}

/// How one message's delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Exhausted,
    Cancelled,
}

impl Subscriber {
    /// A fresh, active subscriber with an empty queue. The loop is not running yet.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            queue: MessageQueue::new(),
            state: Mutex::new(SubscriberState {
                active: true,
                last_active: Utc::now(),
                cancel: CancellationToken::new(),
            }),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.state.lock().last_active
    }

    pub fn add_message(&self, msg: Arc<Message>) {
        self.queue.enqueue(msg);
    }

    /// Marks the subscriber inactive. The loop is left alone; it stops on
    /// its own at the next message or is cancelled by the cleanup sweep.
    pub fn deactivate(&self) {
        let mut state = self.state.lock();
        state.active = false;
        state.last_active = Utc::now();
    }

    // Checked under the state lock: a reactivation cancels the old token
    // under the same lock, so a stale loop cannot switch off a new one.
    fn deactivate_unless_cancelled(&self, cancel: &CancellationToken) {
        let mut state = self.state.lock();
        if cancel.is_cancelled() {
            return;
        }
        state.active = false;
        state.last_active = Utc::now();
    }

    /// Turns the subscriber back on, cancelling any previous loop, and
    /// returns the token for the loop the caller is about to launch.
    pub fn reactivate(&self) -> CancellationToken {
        let mut state = self.state.lock();
        state.cancel.cancel();
        state.cancel = CancellationToken::new();
        state.active = true;
        state.last_active = Utc::now();
        state.cancel.clone()
    }

    /// Token of the current loop.
    pub fn cancel_token(&self) -> CancellationToken {
        self.state.lock().cancel.clone()
    }

    /// Tears down the current loop.
    pub fn cancel(&self) {
        self.state.lock().cancel.cancel();
    }

    /// True once the current loop has been torn down (reclaimed or closed).
    pub fn is_cancelled(&self) -> bool {
        self.state.lock().cancel.is_cancelled()
    }

    /// Inactive and idle for at least `inactive_time` as of `now`.
    pub fn is_reclaimable(&self, inactive_time: std::time::Duration, now: DateTime<Utc>) -> bool {
        let state = self.state.lock();
        if state.active {
            return false;
        }
        match chrono::TimeDelta::from_std(inactive_time) {
            Ok(limit) => now - state.last_active >= limit,
            Err(_) => false,
        }
    }

    /// Records a successful push of `msg`: acks it and drops it from the
    /// head of the queue. Does nothing and returns `false` once `cancel`
    /// has fired, since a newer loop then owns the queue.
    ///
    /// Runs under the state lock, the same one `reactivate` takes to cancel.
    pub(crate) fn commit_delivery(&self, msg: &Arc<Message>, cancel: &CancellationToken) -> bool {
        let mut state = self.state.lock();
        if cancel.is_cancelled() {
            return false;
        }
        msg.ack(&self.address);
        state.last_active = Utc::now();
        self.queue.dequeue_if(msg);
        true
    }

    /// Starts the delivery loop. Must be called from within a tokio runtime.
    pub fn spawn(
        self: &Arc<Self>,
        topic: String,
        pusher: Arc<dyn Pusher>,
        config: DeliveryConfig,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let subscriber = self.clone();
        tokio::spawn(async move { subscriber.run(&topic, pusher, config, cancel).await })
    }

    /// Drains the private queue until cancelled or until a message cannot
    /// be delivered within `config.retry_count` attempts. A message is only
    /// acknowledged and removed after a successful push; on exhaustion it
    /// stays at the head of the queue for a later reactivation.
    pub async fn run(
        &self,
        topic: &str,
        pusher: Arc<dyn Pusher>,
        config: DeliveryConfig,
        cancel: CancellationToken,
    ) {
        debug!(topic, address = %self.address, "delivery loop started");
        loop {
            if !self.is_active() {
                debug!(topic, address = %self.address, "subscriber inactive, loop exits");
                return;
            }

            let msg = tokio::select! {
                _ = cancel.cancelled() => return,
                msg = self.queue.peek() => msg,
            };

            if cancel.is_cancelled() || !self.is_active() {
                return;
            }

            match self.deliver(topic, &msg, pusher.as_ref(), &config, &cancel).await {
                DeliveryOutcome::Delivered => {
                    if !self.commit_delivery(&msg, &cancel) {
                        return;
                    }
                }
                DeliveryOutcome::Exhausted => {
                    warn!(
                        topic,
                        address = %self.address,
                        id = %msg.id,
                        retries = config.retry_count,
                        "delivery retries exhausted, deactivating subscriber"
                    );
                    self.deactivate_unless_cancelled(&cancel);
                    return;
                }
                DeliveryOutcome::Cancelled => return,
            }
        }
    }

    /// Attempts one message up to `retry_count` times (at least once) with a
    /// fixed wait in between. The wait ends early on cancellation.
    pub async fn deliver(
        &self,
        topic: &str,
        msg: &Message,
        pusher: &dyn Pusher,
        config: &DeliveryConfig,
        cancel: &CancellationToken,
    ) -> DeliveryOutcome {
        let payload = DeliveryPayload {
            id: msg.id.clone(),
            payload: msg.payload.clone(),
            topic: topic.to_string(),
        };

        let attempts = config.retry_count.max(1);
        for attempt in 1..=attempts {
            if cancel.is_cancelled() {
                return DeliveryOutcome::Cancelled;
            }

            match pusher.push(&self.address, &payload).await {
                Ok(()) => {
                    debug!(topic, address = %self.address, id = %msg.id, attempt, "delivered");
                    return DeliveryOutcome::Delivered;
                }
                Err(e) => {
                    info!(
                        topic,
                        address = %self.address,
                        id = %msg.id,
                        attempt,
                        error = %e,
                        "delivery attempt failed"
                    );
                }
            }

            if attempt < attempts {
                tokio::select! {
                    _ = cancel.cancelled() => return DeliveryOutcome::Cancelled,
                    _ = tokio::time::sleep(config.retry_interval) => {}
                }
            }
        }

        DeliveryOutcome::Exhausted
    }
}
