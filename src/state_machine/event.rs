//! Events that can occur in a conversation

use super::state::BubbleId;
use crate::message::Message;
use chrono::{DateTime, Utc};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Bootstrap events
    BootstrapStarted,
    SessionEstablished,
    SessionFailed {
        message: String,
    },
    HistoryLoaded {
        messages: Vec<Message>,
        is_active: bool,
    },
    HistoryFailed {
        message: String,
    },

    // Player events
    Submit {
        text: String,
        /// Handle for the optimistic bubble, assigned by the caller
        bubble: BubbleId,
        sent_at: DateTime<Utc>,
    },
    InputChanged,

    // Send outcome events
    SendSucceeded {
        player_message: Option<Message>,
        valezap_message: Option<Message>,
        ended: bool,
    },
    SendFailed {
        message: String,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::BootstrapStarted => "bootstrap_started",
            Event::SessionEstablished => "session_established",
            Event::SessionFailed { .. } => "session_failed",
            Event::HistoryLoaded { .. } => "history_loaded",
            Event::HistoryFailed { .. } => "history_failed",
            Event::Submit { .. } => "submit",
            Event::InputChanged => "input_changed",
            Event::SendSucceeded { .. } => "send_succeeded",
            Event::SendFailed { .. } => "send_failed",
        }
    }
}
