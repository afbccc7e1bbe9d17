//! Playback coordination: one state machine owning the output session and
//! the transport state, driven by events from every control surface.

mod coordinator;
mod queue;
mod thread;
mod types;

pub use thread::PlayerHandle;
pub use types::{Interruption, PlayerCmd, PlayerEvent, TransportState};

#[cfg(test)]
mod tests;
