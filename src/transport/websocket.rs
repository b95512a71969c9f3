//! WebSocket transport
//!
//! A minimal WebSocket server that translates protocol JSON messages into
//! broker operations. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Decode each text frame as a `ClientMessage` and run it against the broker
//! - Answer every request with exactly one `ServerMessage` frame
//!
//! Deliveries never travel over these connections: they are pushed to each
//! subscriber's registered HTTP address by its delivery loop.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use crate::broker::Broker;
use crate::transport::handle_text;
use crate::utils::Result;

/// Binds `addr` and serves until the process exits.
pub async fn start_websocket_server(addr: &str, broker: Arc<Broker>) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("WebSocket server listening on ws://{addr}");
    serve(listener, broker).await;
    Ok(())
}

/// Accepts connections on an already bound listener.
pub async fn serve(listener: TcpListener, broker: Arc<Broker>) {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };

        let broker = broker.clone();
        tokio::spawn(async move {
            debug!(%peer, "connection opened");
            if let Err(e) = handle_connection(stream, broker).await {
                warn!(%peer, error = %e, "connection closed with error");
            }
            debug!(%peer, "connection closed");
        });
    }
}

async fn handle_connection(stream: TcpStream, broker: Arc<Broker>) -> Result<()> {
    let ws_stream = accept_async(stream).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        let msg = msg?;
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }

        let reply = handle_text(&broker, msg.to_text()?);
        let json = serde_json::to_string(&reply)?;
        ws_sender.send(WsMessage::text(json)).await?;
    }

    Ok(())
}
