//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! result. All I/O is requested through the returned effects.

use super::state::{ChatContext, ChatState, Connection, Delivery, Outgoing, Status};
use super::{Effect, Event};
use crate::message::Message;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A message is already being sent")]
    SendInFlight,
    #[error("Input is locked")]
    InputLocked,
    #[error("No message is being sent")]
    NoSendInFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state.connection, event) {
        // ============================================================
        // Bootstrap
        // ============================================================
        (Connection::Connecting, Event::BootstrapStarted) => {
            let next = ChatState {
                locked: true,
                ..state.clone()
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::SetConnection(Connection::Connecting))
                .with_effect(Effect::LockInput))
        }

        (Connection::Connecting, Event::SessionEstablished) => {
            let next = ChatState {
                connection: Connection::Online,
                ..state.clone()
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::SetConnection(Connection::Online))
                .with_effect(Effect::FetchHistory))
        }

        // Terminal for the page: no automatic retry
        (Connection::Connecting, Event::SessionFailed { .. }) => {
            let next = ChatState {
                connection: Connection::Offline,
                locked: true,
                status: Some(Status::BootstrapFailed),
                ..state.clone()
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::SetConnection(Connection::Offline))
                .with_effect(Effect::LockInput)
                .with_effect(Effect::status(Status::BootstrapFailed)))
        }

        (Connection::Online, Event::HistoryLoaded { messages, is_active })
            if !state.is_sending() =>
        {
            let mut next = state.clone();
            let mut result = TransitionResult::new(next.clone())
                .with_effect(Effect::ClearLog)
                .with_effects(messages.into_iter().map(Effect::ShowMessage));

            if is_active && !state.ended {
                next.locked = false;
                result = result.with_effect(Effect::UnlockInput);
            } else {
                next.ended = true;
                next.locked = true;
                next.status = Some(Status::Ended);
                result = result
                    .with_effect(Effect::LockInput)
                    .with_effect(Effect::status(Status::Ended));
            }
            result.new_state = next;
            Ok(result)
        }

        // History is best-effort; the conversation stays usable
        (Connection::Online, Event::HistoryFailed { .. }) if !state.is_sending() => {
            let mut next = ChatState {
                status: Some(Status::HistoryUnavailable),
                ..state.clone()
            };
            let mut result = TransitionResult::new(next.clone())
                .with_effect(Effect::status(Status::HistoryUnavailable));
            if !state.ended {
                next.locked = false;
                result = result.with_effect(Effect::UnlockInput);
            }
            result.new_state = next;
            Ok(result)
        }

        // ============================================================
        // Player input
        // ============================================================
        (_, Event::InputChanged) => {
            if state.status.is_none() {
                return Ok(TransitionResult::new(state.clone()));
            }
            let next = ChatState {
                status: None,
                ..state.clone()
            };
            Ok(TransitionResult::new(next).with_effect(Effect::clear_status()))
        }

        (_, Event::Submit { .. }) if state.ended => Ok(reject(state, Status::Ended)),

        (_, Event::Submit { .. }) if state.is_sending() => Err(TransitionError::SendInFlight),

        (Connection::Online, Event::Submit { text, bubble, sent_at }) if !state.locked => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(reject(state, Status::EmptyMessage));
            }
            let max = context.max_message_length;
            if text.chars().count() > max {
                return Ok(reject(state, Status::TooLong { max }));
            }

            let next = ChatState {
                locked: true,
                status: Some(Status::Sending),
                outgoing: Some(Outgoing {
                    bubble: bubble.clone(),
                    text: text.to_string(),
                    sent_at,
                    delivery: Delivery::Pending,
                }),
                ..state.clone()
            };
            Ok(TransitionResult::new(next)
                .with_effect(Effect::LockInput)
                .with_effect(Effect::status(Status::Sending))
                .with_effect(Effect::ShowPending {
                    bubble,
                    message: Message::optimistic(text, sent_at),
                })
                .with_effect(Effect::ClearInput)
                .with_effect(Effect::SendMessage {
                    text: text.to_string(),
                }))
        }

        (_, Event::Submit { .. }) => Err(TransitionError::InputLocked),

        // ============================================================
        // Send outcome
        // ============================================================
        (
            _,
            Event::SendSucceeded {
                player_message,
                valezap_message,
                ended,
            },
        ) => {
            let pending = pending_outgoing(state)?;
            let mut effects = Vec::new();

            let mut confirmed_at = None;
            if let Some(echo) = player_message {
                confirmed_at = echo.created_at;
                effects.push(Effect::ConfirmPending {
                    bubble: pending.bubble.clone(),
                    message: confirmed_copy(pending, echo),
                });
            }
            if let Some(reply) = valezap_message {
                effects.push(Effect::ShowMessage(reply));
            }

            let mut next = state.clone();
            next.outgoing = Some(Outgoing {
                delivery: Delivery::Confirmed {
                    created_at: confirmed_at,
                },
                ..pending.clone()
            });
            if ended {
                next.ended = true;
                next.locked = true;
                next.status = Some(Status::Ended);
                effects.push(Effect::status(Status::Ended));
            } else {
                next.locked = false;
                next.status = Some(Status::Delivered);
                effects.push(Effect::status(Status::Delivered));
                effects.push(Effect::UnlockInput);
            }
            Ok(TransitionResult::new(next).with_effects(effects))
        }

        (_, Event::SendFailed { message }) => {
            let pending = pending_outgoing(state)?;
            let mut next = state.clone();
            next.outgoing = Some(Outgoing {
                delivery: Delivery::RolledBack { reason: message },
                ..pending.clone()
            });
            next.status = Some(Status::SendFailed);

            let mut result = TransitionResult::new(next.clone())
                .with_effect(Effect::RollbackPending {
                    bubble: pending.bubble.clone(),
                })
                .with_effect(Effect::status(Status::SendFailed));
            if !state.ended {
                next.locked = false;
                result = result.with_effect(Effect::UnlockInput);
            }
            result.new_state = next;
            Ok(result)
        }

        (connection, event) => Err(TransitionError::InvalidTransition(format!(
            "{} while {}",
            event.name(),
            connection.label()
        ))),
    }
}

/// Refuse a submission: only the status line changes
fn reject(state: &ChatState, status: Status) -> TransitionResult {
    let next = ChatState {
        status: Some(status.clone()),
        ..state.clone()
    };
    TransitionResult::new(next).with_effect(Effect::status(status))
}

fn pending_outgoing(state: &ChatState) -> Result<&Outgoing, TransitionError> {
    state
        .outgoing
        .as_ref()
        .filter(|o| o.is_pending())
        .ok_or(TransitionError::NoSendInFlight)
}

/// The server is authoritative for the stored text and time; fall back to
/// the optimistic values for whatever the echo leaves out.
fn confirmed_copy(pending: &Outgoing, echo: Message) -> Message {
    let Message {
        id,
        sender,
        content,
        created_at,
    } = echo;
    Message {
        id,
        sender,
        content: if content.is_empty() {
            pending.text.clone()
        } else {
            content
        },
        created_at: created_at.or(Some(pending.sent_at)),
    }
}
