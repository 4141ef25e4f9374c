//! Conversation messages

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    Player,
    Valezap,
}

impl Sender {
    #[allow(dead_code)] // Wire name, used by views that key on it
    pub fn as_str(self) -> &'static str {
        match self {
            Sender::Player => "player",
            Sender::Valezap => "valezap",
        }
    }
}

/// A single chat message. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Option<i64>,
    pub sender: Sender,
    pub content: String,
    /// `None` when the server sent no timestamp or one that does not parse
    pub created_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Locally authored message shown before the server confirms it
    pub fn optimistic(content: impl Into<String>, sent_at: DateTime<Utc>) -> Self {
        Self {
            id: None,
            sender: Sender::Player,
            content: content.into(),
            created_at: Some(sent_at),
        }
    }
}

/// Parse a server timestamp.
///
/// Accepts RFC 3339 and offset-less ISO 8601 (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
