//! Topic management
//!
//! A `Topic` owns everything published under one name:
//! - a bounded intake channel feeding the topic's dispatch loop
//! - the durable queue of retained messages (replayed on `read_old`
//!   subscribe, scanned by the cleanup sweeps)
//! - the set of retained message ids, used to drop duplicate publishes
//! - the subscribers, in subscription order
//!
//! The id set, the durable queue and the subscriber list only change under
//! the topic lock. Fan-out to subscriber queues happens outside it, from a
//! snapshot of the subscriber list.

use std::collections::HashSet;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broker::delivery::{DeliveryConfig, Pusher};
use crate::broker::message::Message;
use crate::broker::queue::MessageQueue;
use crate::broker::subscriber::Subscriber;
use crate::utils::{Error, Result};

/// Successful result of a publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// New id, queued for fan-out.
    Accepted,
    /// The id is already retained by the topic; nothing was queued.
    Duplicate,
}

#[derive(Debug, Default)]
struct TopicState {
    message_ids: HashSet<String>,
    subscribers: Vec<Arc<Subscriber>>,
}

#[derive(Debug)]
pub struct Topic {
    pub name: String,
    intake: mpsc::Sender<Arc<Message>>,
    queue: MessageQueue,
    state: Mutex<TopicState>,
    pusher: Arc<dyn Pusher>,
    delivery: DeliveryConfig,
    shutdown: CancellationToken,
}

impl Topic {
    /// Creates the topic and starts its dispatch loop. Must be called from
    /// within a tokio runtime.
    pub fn new(
        name: &str,
        buffer_size: usize,
        pusher: Arc<dyn Pusher>,
        delivery: DeliveryConfig,
    ) -> Arc<Self> {
        let (intake, rx) = mpsc::channel(buffer_size.max(1));
        let topic = Arc::new(Self {
            name: name.to_string(),
            intake,
            queue: MessageQueue::new(),
            state: Mutex::new(TopicState::default()),
            pusher,
            delivery,
            shutdown: CancellationToken::new(),
        });

        let shutdown = topic.shutdown.clone();
        tokio::spawn(Self::dispatch(Arc::downgrade(&topic), rx, shutdown));
        debug!(topic = name, buffer_size, "topic created");
        topic
    }

    /// Accepts `msg` unless its id is already retained or the intake channel
    /// is full. A rejected message leaves no trace in the topic.
    pub fn publish(&self, msg: Message) -> Result<PublishOutcome> {
        let mut state = self.state.lock();
        if state.message_ids.contains(&msg.id) {
            debug!(topic = %self.name, id = %msg.id, "duplicate publish ignored");
            return Ok(PublishOutcome::Duplicate);
        }

        let msg = Arc::new(msg);
        match self.intake.try_send(msg.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(Error::Backpressure {
                    topic: self.name.clone(),
                });
            }
            Err(TrySendError::Closed(_)) => return Err(Error::TopicClosed(self.name.clone())),
        }

        state.message_ids.insert(msg.id.clone());
        self.queue.enqueue(msg);
        Ok(PublishOutcome::Accepted)
    }

    async fn dispatch(
        topic: Weak<Topic>,
        mut rx: mpsc::Receiver<Arc<Message>>,
        shutdown: CancellationToken,
    ) {
        loop {
            let msg = tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            match topic.upgrade() {
                Some(topic) => topic.fan_out(&msg),
                None => break,
            }
        }
        debug!("dispatch loop stopped");
    }

    /// Hands `msg` to every current subscriber. The subscriber is registered
    /// in the ack map before the message reaches its queue, and skipped if it
    /// already holds the message from a replay.
    fn fan_out(&self, msg: &Arc<Message>) {
        let subscribers = self.state.lock().subscribers.clone();

        for sub in subscribers {
            if !msg.add_subscriber(&sub.address) {
                continue;
            }
            // reclaimed while we were fanning out: its entry must not linger
            if sub.is_cancelled() {
                msg.remove_subscriber(&sub.address);
                continue;
            }
            sub.add_message(msg.clone());
        }
    }

    /// Registers `address`, reactivating an inactive subscriber in place.
    /// Subscribing an already active address is a no-op.
    ///
    /// A new subscriber with `read_old` receives every retained message, in
    /// durable queue order.
    ///
    /// Spawns the delivery loop, so it must be called from within a tokio
    /// runtime.
    pub fn subscribe(&self, address: &str, read_old: bool) {
        let mut state = self.state.lock();

        if let Some(existing) = state.subscribers.iter().find(|s| s.address == address) {
            if existing.is_active() {
                debug!(topic = %self.name, address, "already subscribed");
                return;
            }
            let cancel = existing.reactivate();
            existing.spawn(
                self.name.clone(),
                self.pusher.clone(),
                self.delivery.clone(),
                cancel,
            );
            info!(topic = %self.name, address, pending = existing.queue.len(), "subscriber reactivated");
            return;
        }

        let sub = Arc::new(Subscriber::new(address));
        if read_old {
            for msg in self.queue.snapshot() {
                msg.add_subscriber(address);
                sub.add_message(msg);
            }
        }

        let cancel = sub.cancel_token();
        sub.spawn(
            self.name.clone(),
            self.pusher.clone(),
            self.delivery.clone(),
            cancel,
        );
        info!(topic = %self.name, address, read_old, replayed = sub.queue.len(), "subscriber added");
        state.subscribers.push(sub);
    }

    /// Marks the subscriber inactive. Removal is left to `cleanup_subscribers`.
    pub fn unsubscribe(&self, address: &str) -> Result<()> {
        let state = self.state.lock();
        match state.subscribers.iter().find(|s| s.address == address) {
            Some(sub) => {
                sub.deactivate();
                info!(topic = %self.name, address, "subscriber deactivated");
                Ok(())
            }
            None => Err(Error::UnknownSubscriber {
                topic: self.name.clone(),
                address: address.to_string(),
            }),
        }
    }

    /// Reclaims subscribers that are inactive and idle for at least
    /// `inactive_time`: their loop is cancelled and their ack entries are
    /// removed from every retained message. Returns how many were reclaimed.
    pub fn cleanup_subscribers(&self, inactive_time: Duration) -> usize {
        let mut state = self.state.lock();
        let now = Utc::now();

        let (reclaimed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.subscribers)
            .into_iter()
            .partition(|sub| sub.is_reclaimable(inactive_time, now));
        state.subscribers = kept;

        for sub in &reclaimed {
            sub.cancel();
            for i in 0..self.queue.len() {
                if let Some(msg) = self.queue.get_at(i) {
                    msg.remove_subscriber(&sub.address);
                }
            }
            info!(topic = %self.name, address = %sub.address, "subscriber reclaimed");
        }

        reclaimed.len()
    }

    /// Deletes every retained message that is fully acknowledged and at least
    /// `ttl` old. Returns how many were deleted.
    pub fn cleanup_messages(&self, ttl: Duration) -> usize {
        let mut state = self.state.lock();
        let mut deleted = 0;

        // delete_at swaps the last message into slot i, so i is rechecked
        let mut i = 0;
        while i < self.queue.len() {
            let expired = self
                .queue
                .get_at(i)
                .is_some_and(|msg| msg.safe_to_delete(ttl));
            if !expired {
                i += 1;
                continue;
            }
            if let Some(msg) = self.queue.delete_at(i) {
                state.message_ids.remove(&msg.id);
                deleted += 1;
            }
        }

        if deleted > 0 {
            debug!(topic = %self.name, deleted, "messages cleaned up");
        }
        deleted
    }

    /// Stops the dispatch loop and every delivery loop. Further publishes fail
    /// with `TopicClosed` once the dispatch loop has exited.
    pub fn close(&self) {
        self.shutdown.cancel();
        for sub in &self.state.lock().subscribers {
            sub.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.state.lock().message_ids.contains(id)
    }

    pub fn message(&self, id: &str) -> Option<Arc<Message>> {
        self.queue.snapshot().into_iter().find(|m| m.id == id)
    }

    pub fn subscriber(&self, address: &str) -> Option<Arc<Subscriber>> {
        self.state
            .lock()
            .subscribers
            .iter()
            .find(|s| s.address == address)
            .cloned()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers.len()
    }
}
