//! Booking conversation state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

mod effect;
pub mod event;
pub mod prompts;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, OutboundIntent};
pub use event::{Event, InboundMessage};
pub use state::{BookingState, FlowContext};
pub use transition::{transition, TransitionError, TransitionResult};
