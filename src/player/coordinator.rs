//! The playback state machine.
//!
//! All transport changes go through [`Coordinator::handle`]. The current
//! index is never trusted across events: it is re-resolved from the loaded
//! track's id against the latest catalog snapshot before anything else runs.

use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::{AudioOutput, OutputSession};
use crate::config::PlaybackSettings;
use crate::error::PlayerError;
use crate::library::{CatalogSnapshot, position_of};
use crate::mpris::{NowPlaying, NowPlayingInfo};

use super::queue::{build_order, step};
use super::types::{Interruption, PlayerEvent, TransportState};

pub struct Coordinator<O: AudioOutput, N: NowPlaying> {
    output: O,
    remote: N,
    settings: PlaybackSettings,
    storage_dir: PathBuf,
    tracks: CatalogSnapshot,
    session: Option<O::Session>,
    state: TransportState,
    /// Traversal order over `tracks` (identity unless shuffling).
    order: Vec<usize>,
    scrubbing: bool,
    interrupted_while_playing: bool,
    now_playing: Option<NowPlayingInfo>,
    subscribers: Vec<Sender<TransportState>>,
}

impl<O: AudioOutput, N: NowPlaying> Coordinator<O, N> {
    pub fn new(
        output: O,
        remote: N,
        settings: PlaybackSettings,
        storage_dir: PathBuf,
        tracks: CatalogSnapshot,
    ) -> Self {
        let state = TransportState {
            repeat: settings.repeat,
            shuffle: settings.shuffle,
            ..TransportState::default()
        };
        let order = build_order(tracks.len(), state.shuffle, None);
        Self {
            output,
            remote,
            settings,
            storage_dir,
            tracks,
            session: None,
            state,
            order,
            scrubbing: false,
            interrupted_while_playing: false,
            now_playing: None,
            subscribers: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &TransportState {
        &self.state
    }

    /// A receiver that gets the current state now and every later one.
    #[cfg(test)]
    pub fn subscribe(&mut self) -> std::sync::mpsc::Receiver<TransportState> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.add_subscriber(tx);
        rx
    }

    pub fn add_subscriber(&mut self, tx: Sender<TransportState>) {
        if tx.send(self.state.clone()).is_ok() {
            self.subscribers.push(tx);
        }
    }

    pub fn handle(&mut self, event: PlayerEvent) -> Result<(), PlayerError> {
        if let PlayerEvent::CatalogChanged(tracks) = event {
            self.catalog_changed(tracks);
            return Ok(());
        }

        self.revalidate();

        match event {
            PlayerEvent::Play(id) => {
                let index =
                    position_of(&self.tracks, &id).ok_or(PlayerError::TrackNotFound(id))?;
                self.play_index(index)
            }
            PlayerEvent::TogglePlayPause => {
                if self.state.playing {
                    self.pause();
                } else {
                    self.resume();
                }
                Ok(())
            }
            PlayerEvent::Resume => {
                self.resume();
                Ok(())
            }
            PlayerEvent::Pause => {
                self.pause();
                Ok(())
            }
            PlayerEvent::SkipForward => self.skip(true),
            PlayerEvent::SkipBack => self.skip_back(),
            PlayerEvent::Seek(t) => self.seek(t),
            PlayerEvent::BeginScrub => {
                self.scrubbing = true;
                Ok(())
            }
            PlayerEvent::EndScrub(t) => {
                self.scrubbing = false;
                self.seek(t)
            }
            PlayerEvent::SetRepeat(on) => {
                self.set_repeat(on);
                Ok(())
            }
            PlayerEvent::ToggleRepeat => {
                self.set_repeat(!self.state.repeat);
                Ok(())
            }
            PlayerEvent::SetShuffle(on) => {
                self.set_shuffle(on);
                Ok(())
            }
            PlayerEvent::ToggleShuffle => {
                self.set_shuffle(!self.state.shuffle);
                Ok(())
            }
            PlayerEvent::Stop => {
                self.stop();
                Ok(())
            }
            PlayerEvent::PlaybackFinished { success } => self.finished(success),
            PlayerEvent::Interruption(Interruption::Began) => {
                self.interrupted_while_playing |= self.state.playing;
                self.pause();
                Ok(())
            }
            PlayerEvent::Interruption(Interruption::Ended { should_resume }) => {
                // A track the user paused before the interruption stays paused.
                if should_resume && self.interrupted_while_playing {
                    self.resume();
                }
                self.interrupted_while_playing = false;
                Ok(())
            }
            PlayerEvent::Tick => self.tick(),
            PlayerEvent::CatalogChanged(_) => Ok(()),
        }
    }

    /// Fade the session out over `fade_out` and tear it down.
    pub fn shutdown(&mut self, fade_out: Duration) {
        if let Some(session) = self.session.as_mut() {
            if self.state.playing && !fade_out.is_zero() {
                fade_out_session(session, fade_out);
            }
        }
        self.stop();
    }

    fn commit(&mut self, next: TransportState) {
        if next == self.state {
            return;
        }
        self.state = next;
        let state = &self.state;
        self.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
    }

    fn update(&mut self, f: impl FnOnce(&mut TransportState)) {
        let mut next = self.state.clone();
        f(&mut next);
        self.commit(next);
    }

    /// Re-resolve the loaded track's index; stop if it left the catalog.
    fn revalidate(&mut self) {
        let Some(id) = self.state.track_id.clone() else {
            return;
        };
        match position_of(&self.tracks, &id) {
            Some(i) if self.state.index == Some(i) => {}
            Some(i) => {
                debug!("track {id} moved to index {i}");
                self.update(|s| s.index = Some(i));
            }
            None => {
                info!("loaded track {id} was removed; stopping");
                self.stop();
            }
        }
    }

    fn catalog_changed(&mut self, tracks: CatalogSnapshot) {
        self.tracks = tracks;
        self.revalidate();
        self.order = build_order(self.tracks.len(), self.state.shuffle, self.state.index);
    }

    fn play_index(&mut self, index: usize) -> Result<(), PlayerError> {
        let track = self
            .tracks
            .get(index)
            .cloned()
            .ok_or(PlayerError::IndexOutOfRange(index))?;

        // At most one session exists; the old one goes before the new one opens.
        self.teardown();

        let path = self.storage_dir.join(&track.file_ref);
        if !path.exists() {
            self.stop();
            return Err(PlayerError::ResourceUnavailable { path });
        }

        let mut session = match self.output.open(&path) {
            Ok(s) => s,
            Err(e) => {
                self.stop();
                return Err(e);
            }
        };
        session.play();
        let total = track
            .duration
            .or_else(|| session.duration())
            .unwrap_or_default();
        self.session = Some(session);

        info!("playing {} ({})", track.display(), track.id);
        self.update(|s| {
            s.index = Some(index);
            s.track_id = Some(track.id.clone());
            s.playing = true;
            s.elapsed = Duration::ZERO;
            s.total = total;
        });

        let mut np = NowPlayingInfo::for_track(&track, path);
        np.duration = total;
        self.now_playing = Some(np);
        self.publish_now_playing();
        Ok(())
    }

    fn resume(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if self.state.playing {
            return;
        }
        session.play();
        self.update(|s| s.playing = true);
        self.publish_now_playing();
    }

    fn pause(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !self.state.playing {
            return;
        }
        session.pause();
        self.update(|s| s.playing = false);
        self.publish_now_playing();
    }

    fn skip(&mut self, forward: bool) -> Result<(), PlayerError> {
        let Some(current) = self.state.index else {
            return Ok(());
        };
        match step(&self.order, current, forward) {
            Some(next) => self.play_index(next),
            None => Ok(()),
        }
    }

    fn skip_back(&mut self) -> Result<(), PlayerError> {
        if self.state.index.is_none() {
            return Ok(());
        }
        if !self.scrubbing {
            self.refresh_elapsed();
        }
        let threshold = Duration::from_secs(self.settings.restart_threshold_secs);
        if self.state.elapsed <= threshold {
            self.skip(false)
        } else {
            self.seek(Duration::ZERO)
        }
    }

    fn seek(&mut self, to: Duration) -> Result<(), PlayerError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        let total = self.state.total;
        let target = if total.is_zero() { to } else { to.min(total) };

        session.seek(target)?;
        self.update(|s| s.elapsed = target);
        self.publish_now_playing();

        if !total.is_zero() && target >= total {
            return self.finished(true);
        }
        Ok(())
    }

    fn set_repeat(&mut self, on: bool) {
        self.update(|s| s.repeat = on);
        self.publish_now_playing();
    }

    fn set_shuffle(&mut self, on: bool) {
        self.update(|s| s.shuffle = on);
        self.order = build_order(self.tracks.len(), on, self.state.index);
        self.publish_now_playing();
    }

    fn finished(&mut self, success: bool) -> Result<(), PlayerError> {
        if !success {
            let path = self
                .now_playing
                .as_ref()
                .map(|np| np.path.clone())
                .unwrap_or_default();
            warn!("playback of {} ended with an error", path.display());
            self.stop();
            return Err(PlayerError::Session {
                path,
                message: "playback ended unexpectedly".to_string(),
            });
        }

        match self.state.index {
            Some(i) if self.state.repeat => self.play_index(i),
            Some(_) => self.skip(true),
            None => Ok(()),
        }
    }

    fn tick(&mut self) -> Result<(), PlayerError> {
        if self.scrubbing || self.session.is_none() {
            return Ok(());
        }
        self.refresh_elapsed();
        self.publish_now_playing();

        let drained = self.session.as_ref().is_some_and(|s| s.is_finished());
        if self.state.playing && drained {
            return self.handle(PlayerEvent::PlaybackFinished { success: true });
        }
        Ok(())
    }

    fn refresh_elapsed(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let mut elapsed = session.position();
        if !self.state.total.is_zero() {
            elapsed = elapsed.min(self.state.total);
        }
        self.update(|s| s.elapsed = elapsed);
    }

    fn publish_now_playing(&mut self) {
        let Some(np) = self.now_playing.as_mut() else {
            return;
        };
        np.elapsed = self.state.elapsed;
        np.playing = self.state.playing;
        np.repeat = self.state.repeat;
        np.shuffle = self.state.shuffle;
        self.remote.publish(np);
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    fn stop(&mut self) {
        self.teardown();
        self.scrubbing = false;
        self.interrupted_while_playing = false;
        self.now_playing = None;
        self.update(|s| {
            s.index = None;
            s.track_id = None;
            s.playing = false;
            s.elapsed = Duration::ZERO;
            s.total = Duration::ZERO;
        });
        self.remote.clear();
    }

    #[cfg(test)]
    pub(crate) fn order(&self) -> &[usize] {
        &self.order
    }
}

fn fade_out_session(session: &mut impl OutputSession, fade_out: Duration) {
    let steps: u32 = 20;
    let step = (fade_out / steps).max(Duration::from_millis(1));
    for i in 1..=steps {
        let t = i as f32 / steps as f32;
        session.set_volume(1.0 - t);
        thread::sleep(step);
    }
    session.set_volume(0.0);
}
