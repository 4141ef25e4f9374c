//! Conversation controller
//!
//! Owns the page's conversation state and executes the effects produced by
//! the pure transition function. One instance per page.

use super::traits::{ChatBackend, ChatView};
use crate::api::SendMessageRequest;
use crate::error::{ChatError, HistoryLoadError, SendError};
use crate::format::render_message;
use crate::identity::{self, PlayerId};
use crate::session::{Session, SessionStore, SlotStorage};
use crate::state_machine::{
    transition, BubbleId, ChatContext, ChatState, Delivery, Effect, Event, Status,
    TransitionError,
};
use chrono::Utc;
use reqwest::Url;
use std::collections::VecDeque;

/// What became of a submission that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Refused before any request was made
    Rejected { status: Option<Status> },
    /// Server confirmed the message
    Delivered { ended: bool },
}

pub struct ConversationController<B, S, V>
where
    B: ChatBackend,
    S: SlotStorage,
    V: ChatView,
{
    context: ChatContext,
    state: ChatState,
    backend: B,
    sessions: SessionStore<S>,
    view: V,
    player: Option<PlayerId>,
    session: Option<Session>,
}

impl<B, S, V> ConversationController<B, S, V>
where
    B: ChatBackend,
    S: SlotStorage,
    V: ChatView,
{
    pub fn new(context: ChatContext, backend: B, sessions: SessionStore<S>, view: V) -> Self {
        Self {
            context,
            state: ChatState::default(),
            backend,
            sessions,
            view,
            player: None,
            session: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn player(&self) -> Option<&PlayerId> {
        self.player.as_ref()
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn view(&self) -> &V {
        &self.view
    }

    /// Resolve the player, establish a session and load the history.
    ///
    /// A session failure leaves the page offline and locked; the caller
    /// must reload to try again.
    pub async fn bootstrap(&mut self, page: &mut Url) -> Result<PlayerId, ChatError> {
        self.dispatch(Event::BootstrapStarted).await?;

        let player = if let Some(player) = identity::resolve(page) {
            player
        } else {
            let generated = identity::generate();
            tracing::info!(player = %generated, "Generated player id");
            generated
        };
        identity::persist(&player, page);
        self.player = Some(player.clone());

        match self.sessions.ensure(&self.backend, &player).await {
            Ok(session) => {
                let player = session.player.clone();
                identity::persist(&player, page);
                self.player = Some(player.clone());
                self.session = Some(session);
                self.dispatch(Event::SessionEstablished).await?;
                Ok(player)
            }
            Err(e) => {
                tracing::error!(player = %player, error = %e, "Failed to start conversation");
                self.dispatch(Event::SessionFailed {
                    message: e.to_string(),
                })
                .await?;
                Err(e.into())
            }
        }
    }

    /// Submit the compose input.
    ///
    /// The message is shown immediately and rolled back if delivery fails.
    pub async fn submit(&mut self, raw: &str) -> Result<SubmitOutcome, ChatError> {
        let bubble = BubbleId::new();
        self.dispatch(Event::Submit {
            text: raw.to_string(),
            bubble: bubble.clone(),
            sent_at: Utc::now(),
        })
        .await?;

        match &self.state.outgoing {
            Some(outgoing) if outgoing.bubble == bubble => match &outgoing.delivery {
                Delivery::Confirmed { .. } => Ok(SubmitOutcome::Delivered {
                    ended: self.state.ended,
                }),
                Delivery::RolledBack { reason } => Err(SendError {
                    reason: reason.clone(),
                }
                .into()),
                Delivery::Pending => Err(TransitionError::InvalidTransition(
                    "send finished without an outcome".to_string(),
                )
                .into()),
            },
            _ => Ok(SubmitOutcome::Rejected {
                status: self.state.status.clone(),
            }),
        }
    }

    /// The player started typing again
    pub async fn input_changed(&mut self) -> Result<(), ChatError> {
        self.dispatch(Event::InputChanged).await
    }

    /// Process events in a loop - no recursion
    async fn dispatch(&mut self, event: Event) -> Result<(), ChatError> {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let name = event.name();
            let result = transition(&self.state, &self.context, event).map_err(|e| {
                tracing::warn!(event = name, error = %e, "Event rejected");
                e
            })?;
            self.state = result.new_state;
            tracing::debug!(event = name, state = ?self.state, "Transitioned");

            for effect in result.effects {
                if let Some(follow_up) = self.execute_effect(effect).await? {
                    queue.push_back(follow_up);
                }
            }
        }
        Ok(())
    }

    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Event>, ChatError> {
        match effect {
            Effect::SetConnection(connection) => {
                tracing::info!(connection = connection.label(), "Connection state changed");
                self.view.set_connection(connection);
            }
            Effect::LockInput => self.view.set_input_locked(true),
            Effect::UnlockInput => self.view.set_input_locked(false),
            Effect::SetStatus(status) => self.view.set_status(status.as_ref()),
            Effect::ClearLog => self.view.clear_log(),
            Effect::ShowMessage(message) => {
                self.view
                    .append(&BubbleId::new(), &render_message(&message))?;
            }
            Effect::ShowPending { bubble, message } => {
                self.view.append(&bubble, &render_message(&message))?;
            }
            Effect::ConfirmPending { bubble, message } => {
                self.view.replace(&bubble, &render_message(&message))?;
            }
            Effect::RollbackPending { bubble } => self.view.remove(&bubble),
            Effect::ClearInput => self.view.clear_input(),
            Effect::FetchHistory => return Ok(Some(self.fetch_history().await)),
            Effect::SendMessage { text } => return Ok(Some(self.send(text).await)),
        }
        Ok(None)
    }

    async fn fetch_history(&self) -> Event {
        let Some(session) = &self.session else {
            return Event::HistoryFailed {
                message: "no session".to_string(),
            };
        };

        match self.backend.fetch_history(&session.session_token).await {
            Ok(history) => {
                tracing::info!(
                    count = history.messages.len(),
                    active = history.is_active,
                    "History loaded"
                );
                Event::HistoryLoaded {
                    messages: history.messages.into_iter().map(Into::into).collect(),
                    is_active: history.is_active,
                }
            }
            Err(e) => {
                let error = HistoryLoadError(e);
                tracing::warn!(error = %error, "History unavailable");
                Event::HistoryFailed {
                    message: error.to_string(),
                }
            }
        }
    }

    async fn send(&self, text: String) -> Event {
        let (Some(session), Some(player)) = (&self.session, &self.player) else {
            return Event::SendFailed {
                message: "no session".to_string(),
            };
        };

        let request = SendMessageRequest {
            session_token: session.session_token.clone(),
            player: player.to_string(),
            message: text,
        };
        match self.backend.send_message(&request).await {
            Ok(response) => {
                tracing::info!(
                    player = %player,
                    replied = response.valezap_message.is_some(),
                    ended = response.ended,
                    "Message delivered"
                );
                Event::SendSucceeded {
                    player_message: response.player_message.map(Into::into),
                    valezap_message: response.valezap_message.map(Into::into),
                    ended: response.ended,
                }
            }
            Err(e) => {
                if e.kind.may_have_been_applied() {
                    // No idempotency key: a manual resubmit may duplicate this message.
                    tracing::warn!(player = %player, error = %e, "Send outcome unknown");
                } else {
                    tracing::error!(player = %player, error = %e, "Send failed");
                }
                Event::SendFailed {
                    message: e.to_string(),
                }
            }
        }
    }
}
