//! Audio output: the session traits the coordinator drives and their
//! `rodio` implementation.

mod sink;
mod types;

pub use sink::RodioOutput;
pub use types::{AudioOutput, OutputSession};
