//! Conversation state types

use chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

/// Connection to the chat backend as shown to the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connection {
    #[default]
    Connecting,
    Online,
    Offline,
}

impl Connection {
    pub fn label(self) -> &'static str {
        match self {
            Connection::Connecting => "connecting...",
            Connection::Online => "online",
            Connection::Offline => "offline",
        }
    }
}

/// Handle of a message bubble in the log
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BubbleId(String);

impl BubbleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for BubbleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BubbleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Delivery of an optimistically rendered player message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Shown locally, request outstanding
    Pending,
    /// Server accepted it; timestamp is the server's when echoed
    Confirmed { created_at: Option<DateTime<Utc>> },
    /// Request failed and the bubble was removed
    RolledBack { reason: String },
}

/// The most recent outgoing player message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub bubble: BubbleId,
    pub text: String,
    /// Client clock at submission
    pub sent_at: DateTime<Utc>,
    pub delivery: Delivery,
}

impl Outgoing {
    pub fn is_pending(&self) -> bool {
        matches!(self.delivery, Delivery::Pending)
    }
}

/// Severity of a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// Transient status line under the compose box
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Sending,
    Delivered,
    SendFailed,
    Ended,
    EmptyMessage,
    TooLong { max: usize },
    BootstrapFailed,
    HistoryUnavailable,
}

impl Status {
    pub fn kind(&self) -> StatusKind {
        match self {
            Status::Sending => StatusKind::Info,
            Status::Delivered | Status::Ended => StatusKind::Success,
            Status::SendFailed
            | Status::EmptyMessage
            | Status::TooLong { .. }
            | Status::BootstrapFailed
            | Status::HistoryUnavailable => StatusKind::Error,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Sending => f.write_str("Sending..."),
            Status::Delivered => f.write_str("Message delivered."),
            Status::SendFailed => f.write_str("Could not deliver the message. Please try again."),
            Status::Ended => f.write_str("Conversation ended. Thank you!"),
            Status::EmptyMessage => f.write_str("Type a message."),
            Status::TooLong { max } => {
                write!(f, "Message exceeds the {max}-character limit.")
            }
            Status::BootstrapFailed => {
                f.write_str("Could not start the conversation. Reload the page.")
            }
            Status::HistoryUnavailable => f.write_str("Could not load earlier messages."),
        }
    }
}

/// Static configuration for the transition function
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub max_message_length: usize,
}

impl ChatContext {
    pub fn new(max_message_length: usize) -> Self {
        Self { max_message_length }
    }
}

/// Process-wide conversation state, one per page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatState {
    pub connection: Connection,
    /// One-way latch
    pub ended: bool,
    /// Whether the compose input refuses submissions; always set once ended
    pub locked: bool,
    pub outgoing: Option<Outgoing>,
    pub status: Option<Status>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            connection: Connection::Connecting,
            ended: false,
            locked: true,
            outgoing: None,
            status: None,
        }
    }
}

impl ChatState {
    /// Whether a send request is outstanding
    pub fn is_sending(&self) -> bool {
        self.outgoing.as_ref().is_some_and(Outgoing::is_pending)
    }

    pub fn accepts_input(&self) -> bool {
        !self.locked
    }
}
