//! The `error` module defines the error type used within the `pushsub` application.
//!
//! Only two kinds of failure are ever surfaced to a publisher or subscriber:
//! backpressure on publish and unknown topics on unsubscribe. Everything else
//! here is transport plumbing (HTTP pushes, WebSocket frames, configuration).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The topic's intake channel is at capacity. The producer should retry later.
    #[error("topic {topic} is busy, intake buffer is full")]
    Backpressure { topic: String },

    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    #[error("no subscriber {address} on topic {topic}")]
    UnknownSubscriber { topic: String, address: String },

    /// The topic's dispatch loop has shut down.
    #[error("topic {0} is closed")]
    TopicClosed(String),

    #[error("delivery to {address} rejected with status {status}")]
    Delivery { address: String, status: u16 },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub fn is_backpressure(&self) -> bool {
        matches!(self, Error::Backpressure { .. })
    }
}
