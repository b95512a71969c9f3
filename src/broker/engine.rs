//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - the registry of topics, created on first publish or subscribe
//! - routing publish / subscribe / unsubscribe requests to their topic
//! - the two periodic sweeps: reclaiming inactive subscribers and deleting
//!   fully acknowledged messages past their TTL
//!
//! Concurrency and usage notes:
//! - The registry lock only guards inserting and looking up topics. Once a
//!   caller holds an `Arc<Topic>` it works on the topic directly; the topic
//!   does its own locking.
//! - The broker is meant to be shared as `Arc<Broker>`. All methods take
//!   `&self`, and none of them holds the registry lock across an await.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broker::delivery::{DeliveryConfig, Pusher};
use crate::broker::message::Message;
use crate::broker::topic::{PublishOutcome, Topic};
use crate::utils::{Error, Result};

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of each topic's intake channel.
    pub buffer_size: usize,
    pub delivery: DeliveryConfig,
    /// How long a subscriber stays inactive before it is reclaimed.
    pub inactive_time: Duration,
    pub subscriber_cleanup_interval: Duration,
    /// Minimum age of a fully acknowledged message before it is deleted.
    pub message_ttl: Duration,
    pub message_cleanup_interval: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            buffer_size: 100,
            delivery: DeliveryConfig::default(),
            inactive_time: Duration::from_secs(300),
            subscriber_cleanup_interval: Duration::from_secs(60),
            message_ttl: Duration::from_secs(3600),
            message_cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug)]
pub struct Broker {
    pub config: BrokerConfig,
    topics: RwLock<HashMap<String, Arc<Topic>>>,
    pusher: Arc<dyn Pusher>,
    shutdown: CancellationToken,
}

impl Broker {
    pub fn new(config: BrokerConfig, pusher: Arc<dyn Pusher>) -> Self {
        Self {
            config,
            topics: RwLock::new(HashMap::new()),
            pusher,
            shutdown: CancellationToken::new(),
        }
    }

    /// Returns the topic called `name`, creating it if needed.
    pub fn get_or_create_topic(&self, name: &str) -> Arc<Topic> {
        if let Some(topic) = self.topics.read().get(name) {
            return topic.clone();
        }

        let mut topics = self.topics.write();
        topics
            .entry(name.to_string())
            .or_insert_with(|| {
                info!(topic = name, "creating topic");
                Topic::new(
                    name,
                    self.config.buffer_size,
                    self.pusher.clone(),
                    self.config.delivery.clone(),
                )
            })
            .clone()
    }

    pub fn find_topic(&self, name: &str) -> Option<Arc<Topic>> {
        self.topics.read().get(name).cloned()
    }

    /// Fails with the first name in `names` that has no topic.
    pub fn validate_topics<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let topics = self.topics.read();
        for name in names {
            if !topics.contains_key(name.as_ref()) {
                return Err(Error::UnknownTopic(name.as_ref().to_string()));
            }
        }
        Ok(())
    }

    pub fn topic_names(&self) -> Vec<String> {
        self.topics.read().keys().cloned().collect()
    }

    fn all_topics(&self) -> Vec<Arc<Topic>> {
        self.topics.read().values().cloned().collect()
    }

    pub fn publish(&self, topic: &str, id: &str, payload: &str) -> Result<PublishOutcome> {
        let outcome = self
            .get_or_create_topic(topic)
            .publish(Message::new(id, payload))?;
        debug!(topic, id, ?outcome, "publish");
        Ok(outcome)
    }

    pub fn subscribe(&self, topic: &str, address: &str, read_old: bool) {
        self.get_or_create_topic(topic).subscribe(address, read_old);
    }

    pub fn unsubscribe(&self, topic: &str, address: &str) -> Result<()> {
        self.find_topic(topic)
            .ok_or_else(|| Error::UnknownTopic(topic.to_string()))?
            .unsubscribe(address)
    }

    /// Runs the subscriber sweep over every topic. Returns the number reclaimed.
    pub fn cleanup_subscribers(&self, inactive_time: Duration) -> usize {
        self.all_topics()
            .iter()
            .map(|topic| topic.cleanup_subscribers(inactive_time))
            .sum()
    }

    /// Runs the message sweep over every topic. Returns the number deleted.
    pub fn cleanup_messages(&self, ttl: Duration) -> usize {
        self.all_topics()
            .iter()
            .map(|topic| topic.cleanup_messages(ttl))
            .sum()
    }

    /// Spawns the two periodic sweeps. They stop on `shutdown`.
    pub fn start_sweepers(self: &Arc<Self>) -> (JoinHandle<()>, JoinHandle<()>) {
        let subscribers = {
            let broker = self.clone();
            tokio::spawn(async move {
                let period = broker.config.subscriber_cleanup_interval;
                let inactive_time = broker.config.inactive_time;
                broker
                    .sweep_every(period, "subscriber", move |b| {
                        b.cleanup_subscribers(inactive_time)
                    })
                    .await;
            })
        };

        let messages = {
            let broker = self.clone();
            tokio::spawn(async move {
                let period = broker.config.message_cleanup_interval;
                let ttl = broker.config.message_ttl;
                broker
                    .sweep_every(period, "message", move |b| b.cleanup_messages(ttl))
                    .await;
            })
        };

        (subscribers, messages)
    }

    async fn sweep_every<F>(&self, period: Duration, kind: &'static str, sweep: F)
    where
        F: Fn(&Broker) -> usize,
    {
        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = sweep(self);
                    if removed > 0 {
                        info!(kind, removed, "sweep finished");
                    }
                }
            }
        }
        debug!(kind, "sweeper stopped");
    }

    /// Stops the sweepers and closes every topic.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
        for topic in self.all_topics() {
            topic.close();
        }
        info!("broker shut down");
    }
}
