//! Wire protocol of the front door. Every frame is a JSON object tagged by
//! its `type` field.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "publish")]
    Publish {
        id: String,
        topic: String,
        message: String,
    },

    #[serde(rename = "subscribe")]
    Subscribe {
        address: String,
        topics: Vec<String>,
        #[serde(rename = "readOld", default)]
        read_old: bool,
    },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { address: String, topics: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// `duplicate` is set when the id was already retained by the topic.
    #[serde(rename = "published")]
    Published { topic: String, duplicate: bool },

    #[serde(rename = "subscribed")]
    Subscribed { topics: Vec<String> },

    #[serde(rename = "unsubscribed")]
    Unsubscribed { topics: Vec<String> },

    #[serde(rename = "error")]
    Error { message: String },
}
