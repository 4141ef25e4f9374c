//! API request and response types

use crate::message::{parse_timestamp, Message, Sender};
use serde::{Deserialize, Serialize};

/// Request to open a session for a player
#[derive(Debug, Serialize)]
pub struct CreateSessionRequest<'a> {
    pub player: &'a str,
}

/// Session issued by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct SessionGrant {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
}

/// A message as the backend serializes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    #[serde(default)]
    pub id: Option<i64>,
    pub sender: Sender,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        Message {
            id: wire.id,
            sender: wire.sender,
            content: wire.content,
            created_at: wire.created_at.as_deref().and_then(parse_timestamp),
        }
    }
}

/// Response with the conversation history
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<WireMessage>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Request to send a player message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendMessageRequest {
    pub session_token: String,
    pub player: String,
    pub message: String,
}

/// Response for a delivered player message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SendMessageResponse {
    #[serde(default)]
    pub player_message: Option<WireMessage>,
    #[serde(default)]
    pub valezap_message: Option<WireMessage>,
    #[serde(default)]
    pub ended: bool,
}
