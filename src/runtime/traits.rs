//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the controller with mock implementations.

use crate::api::{ApiError, HistoryResponse, SendMessageRequest, SendMessageResponse, SessionGrant};
use crate::error::TemplateError;
use crate::format::RenderedMessage;
use crate::identity::PlayerId;
use crate::state_machine::{BubbleId, Connection, Status};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for the chat backend
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Issue a session for the player
    async fn create_session(&self, player: &PlayerId) -> Result<SessionGrant, ApiError>;

    /// Get all messages of the session's conversation
    async fn fetch_history(&self, session_token: &str) -> Result<HistoryResponse, ApiError>;

    /// Deliver a player message and collect the reply
    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiError>;
}

/// Presentation surface the controller drives
///
/// The view owns node creation; the controller only hands it sanitized
/// markup and bubble handles.
pub trait ChatView: Send {
    fn set_connection(&mut self, connection: Connection);

    fn set_input_locked(&mut self, locked: bool);

    fn set_status(&mut self, status: Option<&Status>);

    fn clear_log(&mut self);

    /// Append a bubble at the end of the log
    fn append(&mut self, bubble: &BubbleId, message: &RenderedMessage)
        -> Result<(), TemplateError>;

    /// Replace the content and time of an existing bubble
    fn replace(
        &mut self,
        bubble: &BubbleId,
        message: &RenderedMessage,
    ) -> Result<(), TemplateError>;

    /// Remove a bubble; unknown handles are ignored
    fn remove(&mut self, bubble: &BubbleId);

    fn clear_input(&mut self);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn create_session(&self, player: &PlayerId) -> Result<SessionGrant, ApiError> {
        (**self).create_session(player).await
    }

    async fn fetch_history(&self, session_token: &str) -> Result<HistoryResponse, ApiError> {
        (**self).fetch_history(session_token).await
    }

    async fn send_message(
        &self,
        request: &SendMessageRequest,
    ) -> Result<SendMessageResponse, ApiError> {
        (**self).send_message(request).await
    }
}
