//! Shared test doubles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::broker::delivery::{DeliveryConfig, DeliveryPayload, Pusher};
use crate::broker::engine::BrokerConfig;
use crate::utils::{Error, Result};

/// Records every push; fails every attempt while `failing` is set.
#[derive(Debug, Default)]
pub struct RecordingPusher {
    pub pushes: Mutex<Vec<(String, DeliveryPayload)>>,
    pub attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingPusher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let pusher = Self::default();
        pusher.failing.store(true, Ordering::SeqCst);
        Arc::new(pusher)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn delivered_ids(&self, address: &str) -> Vec<String> {
        self.pushes
            .lock()
            .iter()
            .filter(|(addr, _)| addr == address)
            .map(|(_, p)| p.id.clone())
            .collect()
    }
}

#[async_trait]
impl Pusher for RecordingPusher {
    async fn push(&self, address: &str, payload: &DeliveryPayload) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Delivery {
                address: address.to_string(),
                status: 503,
            });
        }
        self.pushes
            .lock()
            .push((address.to_string(), payload.clone()));
        Ok(())
    }
}

pub fn fast_config() -> BrokerConfig {
    BrokerConfig {
        buffer_size: 16,
        delivery: DeliveryConfig {
            retry_count: 3,
            retry_interval: Duration::from_millis(1),
        },
        ..BrokerConfig::default()
    }
}

/// Polls `cond` until it holds, panicking after two seconds.
pub async fn wait_until<F: Fn() -> bool>(what: &str, cond: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !cond() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// A bare HTTP endpoint answering every request with `status` and
/// forwarding each decoded push body to the returned channel.
pub async fn spawn_push_receiver(status: u16) -> (String, mpsc::UnboundedReceiver<DeliveryPayload>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}/push", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                let body = loop {
                    let n = match stream.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                        continue;
                    };
                    let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                    let len = head
                        .lines()
                        .find_map(|l| l.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if buf.len() >= end + 4 + len {
                        break buf[end + 4..end + 4 + len].to_vec();
                    }
                };

                if let Ok(payload) = serde_json::from_slice::<DeliveryPayload>(&body) {
                    let _ = tx.send(payload);
                }
                let response = format!(
                    "HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (addr, rx)
}
