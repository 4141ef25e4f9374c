//! Error taxonomy for the conversation core
//!
//! Bootstrap-phase errors (`IdentityError`, `SessionError`) are terminal for
//! the page; `SendError` is local to a single submission and is recovered by
//! rolling back the optimistic bubble. `TemplateError` is a configuration
//! defect in the view and is never shown to the player as retryable.

use crate::api::ApiError;
use thiserror::Error;

/// Player identifier failed the identity policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("player identifier is empty")]
    Empty,
    #[error("player identifier {0:?} is not an international phone number")]
    InvalidFormat(String),
}

/// Failure reading or writing the single session storage slot
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Session could not be established
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session issuance failed: {0}")]
    Issuance(#[from] ApiError),
    #[error("session issued with malformed expiry {0:?}")]
    MalformedExpiry(String),
    #[error("session issued without a token")]
    MissingToken,
}

/// History could not be loaded; the log stays empty or stale
#[derive(Debug, Error)]
#[error("failed to load message history: {0}")]
pub struct HistoryLoadError(#[from] pub ApiError);

/// A single submission was not delivered and has been rolled back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("message was not delivered: {reason}")]
pub struct SendError {
    pub reason: String,
}

/// The view cannot host a message bubble
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("message template not found")]
    MissingTemplate,
    #[error("message bubble {0} is not in the log")]
    MissingBubble(String),
}

/// Top-level error returned by controller operations
#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Send(#[from] SendError),
    #[error("view template defect: {0}")]
    Template(#[from] TemplateError),
    #[error("controller invariant violated: {0}")]
    Transition(#[from] crate::state_machine::TransitionError),
}
