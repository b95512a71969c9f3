//! Outbound delivery
//!
//! A `Pusher` performs one delivery attempt of one message to one subscriber
//! address. Retry, backoff and acknowledgment are the subscriber loop's job;
//! a pusher only reports whether this attempt succeeded.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::utils::{Error, Result};

/// Body of a delivery push, as seen by the subscriber's endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPayload {
    pub id: String,
    pub payload: String,
    pub topic: String,
}

/// Retry policy for a subscriber's delivery loop.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Attempts per message before the subscriber is deactivated.
    pub retry_count: u32,
    /// Fixed wait between two attempts.
    pub retry_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retry_count: 3,
            retry_interval: Duration::from_secs(1),
        }
    }
}

#[async_trait]
pub trait Pusher: Send + Sync + std::fmt::Debug {
    async fn push(&self, address: &str, payload: &DeliveryPayload) -> Result<()>;
}

/// Pushes over HTTP: `POST <address>` with a JSON body. Only `200 OK` is success.
#[derive(Debug, Clone)]
pub struct HttpPusher {
    client: reqwest::Client,
}

impl HttpPusher {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Pusher for HttpPusher {
    async fn push(&self, address: &str, payload: &DeliveryPayload) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        let response = self
            .client
            .post(address)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        debug!(address, id = %payload.id, status = status.as_u16(), "push response");
        if status != StatusCode::OK {
            return Err(Error::Delivery {
                address: address.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
