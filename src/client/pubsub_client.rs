use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::transport::{ClientMessage, ServerMessage};
use crate::utils::{Error, Result};

/// A connection to the broker's front door.
///
/// Requests are answered in order, one reply per request, so every call
/// sends one frame and waits for the next text frame.
pub struct BrokerClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl BrokerClient {
    /// Connects to e.g. `ws://127.0.0.1:8080`.
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _response) = connect_async(url).await?;
        Ok(Self { ws })
    }

    /// Publishes under a fresh UUID v4 id and returns that id.
    pub async fn publish(&mut self, topic: &str, message: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        self.publish_with_id(&id, topic, message).await?;
        Ok(id)
    }

    /// Publishes under a caller-chosen id. Returns `true` if the broker
    /// already held a message with that id.
    pub async fn publish_with_id(&mut self, id: &str, topic: &str, message: &str) -> Result<bool> {
        let reply = self
            .request(&ClientMessage::Publish {
                id: id.to_string(),
                topic: topic.to_string(),
                message: message.to_string(),
            })
            .await?;

        match reply {
            ServerMessage::Published { duplicate, .. } => Ok(duplicate),
            other => Err(unexpected(other)),
        }
    }

    pub async fn subscribe(&mut self, address: &str, topics: &[&str], read_old: bool) -> Result<()> {
        let reply = self
            .request(&ClientMessage::Subscribe {
                address: address.to_string(),
                topics: topics.iter().map(|t| t.to_string()).collect(),
                read_old,
            })
            .await?;

        match reply {
            ServerMessage::Subscribed { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn unsubscribe(&mut self, address: &str, topics: &[&str]) -> Result<()> {
        let reply = self
            .request(&ClientMessage::Unsubscribe {
                address: address.to_string(),
                topics: topics.iter().map(|t| t.to_string()).collect(),
            })
            .await?;

        match reply {
            ServerMessage::Unsubscribed { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }

    async fn request(&mut self, request: &ClientMessage) -> Result<ServerMessage> {
        let text = serde_json::to_string(request)?;
        self.ws.send(WsMessage::text(text)).await?;

        while let Some(frame) = self.ws.next().await {
            let frame = frame?;
            if frame.is_text() {
                return Ok(serde_json::from_str(frame.to_text()?)?);
            }
            if frame.is_close() {
                break;
            }
        }
        Err(Error::Protocol("connection closed before reply".to_string()))
    }
}

impl std::fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerClient")
            .field("ws", &"WebSocketStream")
            .finish()
    }
}

fn unexpected(reply: ServerMessage) -> Error {
    match reply {
        ServerMessage::Error { message } => Error::Protocol(message),
        other => Error::Protocol(format!("unexpected reply: {other:?}")),
    }
}
