//! The `transport` module is responsible for handling network communication
//! with publishers and subscribers, via WebSockets.
//!
//! It defines the request/reply protocol, maps each decoded request onto a
//! broker operation, and runs the WebSocket server itself.

pub mod message;
pub mod websocket;

pub use message::{ClientMessage, ServerMessage};
pub use websocket::{serve, start_websocket_server};

use tracing::{info, warn};

use crate::broker::{Broker, PublishOutcome};

/// Runs one decoded request against the broker and builds the reply.
pub fn handle_request(broker: &Broker, request: ClientMessage) -> ServerMessage {
    match request {
        ClientMessage::Publish { id, topic, message } => {
            match broker.publish(&topic, &id, &message) {
                Ok(outcome) => ServerMessage::Published {
                    topic,
                    duplicate: outcome == PublishOutcome::Duplicate,
                },
                Err(e) => {
                    warn!(topic = %topic, id = %id, error = %e, "publish rejected");
                    ServerMessage::Error {
                        message: e.to_string(),
                    }
                }
            }
        }

        ClientMessage::Subscribe {
            address,
            topics,
            read_old,
        } => {
            for topic in &topics {
                broker.subscribe(topic, &address, read_old);
            }
            info!(address = %address, ?topics, read_old, "subscribed");
            ServerMessage::Subscribed { topics }
        }

        ClientMessage::Unsubscribe { address, topics } => {
            if let Err(e) = broker.validate_topics(&topics) {
                warn!(address = %address, error = %e, "topics not valid");
                return ServerMessage::Error {
                    message: format!("topics not valid: {e}"),
                };
            }
            for topic in &topics {
                if let Err(e) = broker.unsubscribe(topic, &address) {
                    warn!(address = %address, topic = %topic, error = %e, "failed to unsubscribe");
                    return ServerMessage::Error {
                        message: e.to_string(),
                    };
                }
            }
            info!(address = %address, ?topics, "unsubscribed");
            ServerMessage::Unsubscribed { topics }
        }
    }
}

/// Decodes one text frame and handles it. Malformed input becomes an error reply.
pub fn handle_text(broker: &Broker, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(request) => handle_request(broker, request),
        Err(e) => ServerMessage::Error {
            message: format!("invalid client message: {e}"),
        },
    }
}
