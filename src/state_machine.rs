//! Conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, Keyboard};
pub use event::{ButtonAction, Event};
pub use state::{SessionContext, SessionState};
pub use transition::transition;
