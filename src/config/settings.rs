use std::time::Duration;

use serde::Deserialize;

use crate::broker::{BrokerConfig, DeliveryConfig};

/// Top-level configuration settings for the application.
///
/// Includes settings for the server, the broker's topics, subscriber
/// delivery, message retention and logging.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub broker: BrokerSettings,
    pub subscriber: SubscriberSettings,
    pub message: MessageSettings,
    pub log: LogSettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the WebSocket front door will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    /// Capacity of each topic's intake channel; publishes beyond it are rejected.
    pub buffer_size: usize,
}

/// Delivery and reclamation of subscribers.
#[derive(Debug, Deserialize, Clone)]
pub struct SubscriberSettings {
    pub retry_count: u32,
    pub retry_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub inactive_time_secs: u64,
    pub cleanup_interval_secs: u64,
}

/// Retention of fully acknowledged messages.
#[derive(Debug, Deserialize, Clone)]
pub struct MessageSettings {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub broker: Option<PartialBrokerSettings>,
    pub subscriber: Option<PartialSubscriberSettings>,
    pub message: Option<PartialMessageSettings>,
    pub log: Option<PartialLogSettings>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialBrokerSettings {
    pub buffer_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialSubscriberSettings {
    pub retry_count: Option<u32>,
    pub retry_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub inactive_time_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialMessageSettings {
    pub ttl_secs: Option<u64>,
    pub cleanup_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
pub struct PartialLogSettings {
    pub level: Option<String>,
}

impl PartialSettings {
    /// Fills every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let server = self.server.unwrap_or_default();
        let broker = self.broker.unwrap_or_default();
        let subscriber = self.subscriber.unwrap_or_default();
        let message = self.message.unwrap_or_default();
        let log = self.log.unwrap_or_default();

        Settings {
            server: ServerSettings {
                host: server.host.unwrap_or(default.server.host),
                port: server.port.unwrap_or(default.server.port),
            },
            broker: BrokerSettings {
                buffer_size: broker.buffer_size.unwrap_or(default.broker.buffer_size),
            },
            subscriber: SubscriberSettings {
                retry_count: subscriber
                    .retry_count
                    .unwrap_or(default.subscriber.retry_count),
                retry_interval_ms: subscriber
                    .retry_interval_ms
                    .unwrap_or(default.subscriber.retry_interval_ms),
                request_timeout_ms: subscriber
                    .request_timeout_ms
                    .unwrap_or(default.subscriber.request_timeout_ms),
                inactive_time_secs: subscriber
                    .inactive_time_secs
                    .unwrap_or(default.subscriber.inactive_time_secs),
                cleanup_interval_secs: subscriber
                    .cleanup_interval_secs
                    .unwrap_or(default.subscriber.cleanup_interval_secs),
            },
            message: MessageSettings {
                ttl_secs: message.ttl_secs.unwrap_or(default.message.ttl_secs),
                cleanup_interval_secs: message
                    .cleanup_interval_secs
                    .unwrap_or(default.message.cleanup_interval_secs),
            },
            log: LogSettings {
                level: log.level.unwrap_or(default.log.level),
            },
        }
    }
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.subscriber.request_timeout_ms)
    }

    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            buffer_size: self.broker.buffer_size,
            delivery: DeliveryConfig {
                retry_count: self.subscriber.retry_count,
                retry_interval: Duration::from_millis(self.subscriber.retry_interval_ms),
            },
            inactive_time: Duration::from_secs(self.subscriber.inactive_time_secs),
            subscriber_cleanup_interval: Duration::from_secs(
                self.subscriber.cleanup_interval_secs,
            ),
            message_ttl: Duration::from_secs(self.message.ttl_secs),
            message_cleanup_interval: Duration::from_secs(self.message.cleanup_interval_secs),
        }
    }
}

/// Provides default values for `Settings`.
///
/// Ensures the application has sensible defaults if no configuration is provided.
impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            broker: BrokerSettings { buffer_size: 100 },
            subscriber: SubscriberSettings {
                retry_count: 3,
                retry_interval_ms: 1000,
                request_timeout_ms: 5000,
                inactive_time_secs: 300,
                cleanup_interval_secs: 60,
            },
            message: MessageSettings {
                ttl_secs: 3600,
                cleanup_interval_secs: 60,
            },
            log: LogSettings {
                level: "info".to_string(),
            },
        }
    }
}
