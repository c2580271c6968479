//! Runtime for driving booking conversations
//!
//! Connects the pure state machine to the session store, the outbound
//! transport and the handoff sink.

mod executor;
mod manager;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use executor::{BookingRuntime, InboundOutcome};
pub use manager::RuntimeManager;
pub use traits::*;

use crate::session::{SessionStore, StoreError};
use crate::state_machine::TransitionError;
use thiserror::Error;

/// Runtime wired to trait objects, as built in `main`
pub type ProductionRuntime = BookingRuntime<dyn SessionStore, dyn Transport, dyn NotificationSink>;

/// Inbound ordering over the production runtime
pub type ProductionManager = RuntimeManager<dyn SessionStore, dyn Transport, dyn NotificationSink>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
    #[error("Transition error: {0}")]
    Transition(#[from] TransitionError),
}
