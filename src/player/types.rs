//! Coordinator events and the transport state value it publishes.

use std::sync::mpsc::Sender;
use std::time::Duration;

use crate::library::{CatalogSnapshot, TrackId};

/// Transient playback status. Replaced wholesale on every transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportState {
    /// Position of the loaded track in the current catalog ordering.
    pub index: Option<usize>,
    pub track_id: Option<TrackId>,
    pub playing: bool,
    pub elapsed: Duration,
    pub total: Duration,
    pub repeat: bool,
    pub shuffle: bool,
}

impl TransportState {
    pub fn is_loaded(&self) -> bool {
        self.index.is_some()
    }
}

/// External audio-focus changes, such as the system going to sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Began,
    Ended { should_resume: bool },
}

/// Everything that can change the transport, from any source: UI keys,
/// remote commands, the output session, the catalog.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Play(TrackId),
    TogglePlayPause,
    Resume,
    Pause,
    SkipForward,
    SkipBack,
    Seek(Duration),
    /// Suspend progress polling while the user drags a seek control.
    BeginScrub,
    EndScrub(Duration),
    SetRepeat(bool),
    ToggleRepeat,
    SetShuffle(bool),
    ToggleShuffle,
    Stop,
    PlaybackFinished { success: bool },
    Interruption(Interruption),
    CatalogChanged(CatalogSnapshot),
    /// Periodic progress poll.
    Tick,
}

/// Messages accepted by the player thread.
#[derive(Debug)]
pub enum PlayerCmd {
    Event(PlayerEvent),
    Subscribe(Sender<TransportState>),
    /// Quit the player thread, fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

impl From<PlayerEvent> for PlayerCmd {
    fn from(e: PlayerEvent) -> Self {
        PlayerCmd::Event(e)
    }
}
