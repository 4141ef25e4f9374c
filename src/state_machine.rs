//! Chat state machine
//!
//! `transition` is a pure function of state, context and event; every
//! side effect (view updates, backend calls) comes back as an `Effect`
//! for the controller to run.

mod effect;
mod event;
mod state;
mod transition;


pub use effect::Effect;
pub use event::Event;
pub use state::{BubbleId, ChatContext, ChatState, Connection, Delivery, Outgoing, Status, StatusKind};
pub use transition::{transition, TransitionError};
