//! Seams between the playback coordinator and the audio backend.

use std::path::Path;
use std::time::Duration;

use crate::error::PlayerError;

/// One open decode/output session for a single file.
///
/// Dropping a session must silence it; the coordinator relies on this to
/// guarantee at most one audible session.
pub trait OutputSession {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, to: Duration) -> Result<(), PlayerError>;
    /// Current playback position.
    fn position(&self) -> Duration;
    /// Duration reported by the decoder, if it knows one.
    fn duration(&self) -> Option<Duration>;
    /// True once the decoder has drained.
    fn is_finished(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn stop(&mut self);
}

/// Factory for sessions on an audio device.
pub trait AudioOutput {
    type Session: OutputSession;

    /// Open `path` as a new, paused session.
    fn open(&mut self, path: &Path) -> Result<Self::Session, PlayerError>;
}
