//! Effects produced by state transitions

use super::state::{BubbleId, Connection, Status};
use crate::message::Message;

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Update the connection indicator
    SetConnection(Connection),

    /// Disable the compose input
    LockInput,

    /// Enable the compose input
    UnlockInput,

    /// Show or clear the status line
    SetStatus(Option<Status>),

    /// Empty the message log
    ClearLog,

    /// Append a received message at the end of the log
    ShowMessage(Message),

    /// Append the optimistic player bubble
    ShowPending { bubble: BubbleId, message: Message },

    /// Replace the optimistic bubble with the server's copy
    ConfirmPending { bubble: BubbleId, message: Message },

    /// Remove the optimistic bubble
    RollbackPending { bubble: BubbleId },

    /// Empty the compose input
    ClearInput,

    /// Load the conversation history
    FetchHistory,

    /// Deliver a player message to the backend
    SendMessage { text: String },
}

impl Effect {
    pub fn status(status: Status) -> Self {
        Effect::SetStatus(Some(status))
    }

    pub fn clear_status() -> Self {
        Effect::SetStatus(None)
    }
}
