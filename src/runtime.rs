//! Runtime for driving a conversation
//!
//! Wires the pure state machine to the backend, the session cache and the
//! view.

mod controller;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use controller::{ConversationController, SubmitOutcome};
pub use traits::*;
