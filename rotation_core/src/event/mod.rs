//! Event queue - scheduled future mutations of the simulation
//!
//! Events carry a serializable [`EventEffect`] descriptor instead of a
//! callback; the engine interprets the descriptor when the event fires.

mod effect;
mod queue;

pub use effect::EventEffect;
pub use queue::{Event, EventId, EventQueue};
