use super::*;
use super::coordinator::Coordinator;
use crate::audio::{AudioOutput, OutputSession};
use crate::config::PlaybackSettings;
use crate::error::PlayerError;
use crate::library::{CatalogSnapshot, Track, TrackId};
use crate::mpris::{NowPlaying, NowPlayingInfo};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

#[derive(Debug, Default)]
struct Device {
    opened: Vec<PathBuf>,
    live: usize,
    position: Duration,
    finished: bool,
    playing: bool,
    seeks: Vec<Duration>,
    volume: f32,
    reject: bool,
}

#[derive(Clone, Default)]
struct FakeOutput(Arc<Mutex<Device>>);

struct FakeSession(Arc<Mutex<Device>>);

impl AudioOutput for FakeOutput {
    type Session = FakeSession;

    fn open(&mut self, path: &Path) -> Result<FakeSession, PlayerError> {
        let mut d = self.0.lock().unwrap();
        if d.reject {
            return Err(PlayerError::Session {
                path: path.to_path_buf(),
                message: "unsupported".to_string(),
            });
        }
        d.opened.push(path.to_path_buf());
        d.live += 1;
        d.position = Duration::ZERO;
        d.finished = false;
        d.playing = false;
        d.volume = 1.0;
        Ok(FakeSession(self.0.clone()))
    }
}

impl OutputSession for FakeSession {
    fn play(&mut self) {
        self.0.lock().unwrap().playing = true;
    }

    fn pause(&mut self) {
        self.0.lock().unwrap().playing = false;
    }

    fn seek(&mut self, to: Duration) -> Result<(), PlayerError> {
        let mut d = self.0.lock().unwrap();
        d.seeks.push(to);
        d.position = to;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.0.lock().unwrap().position
    }

    fn duration(&self) -> Option<Duration> {
        None
    }

    fn is_finished(&self) -> bool {
        self.0.lock().unwrap().finished
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.lock().unwrap().volume = volume;
    }

    fn stop(&mut self) {
        self.0.lock().unwrap().playing = false;
    }
}

impl Drop for FakeSession {
    fn drop(&mut self) {
        self.0.lock().unwrap().live -= 1;
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Remote {
    Published(NowPlayingInfo),
    Cleared,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Remote>>>);

impl Recorder {
    fn last(&self) -> Option<Remote> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl NowPlaying for Recorder {
    fn publish(&mut self, info: &NowPlayingInfo) {
        self.0.lock().unwrap().push(Remote::Published(info.clone()));
    }

    fn clear(&mut self) {
        self.0.lock().unwrap().push(Remote::Cleared);
    }
}

struct Rig {
    _dir: TempDir,
    storage: PathBuf,
    tracks: Vec<Track>,
    device: FakeOutput,
    remote: Recorder,
    coordinator: Coordinator<FakeOutput, Recorder>,
}

fn make_tracks(storage: &Path, n: usize) -> Vec<Track> {
    fs::create_dir_all(storage).unwrap();
    (0..n)
        .map(|i| {
            let file_ref = format!("song{i}.mp3");
            fs::write(storage.join(&file_ref), b"audio").unwrap();
            let mut t = Track::new(format!("Song {i}"), file_ref);
            t.duration = Some(Duration::from_secs(180));
            t
        })
        .collect()
}

fn snapshot(tracks: &[Track]) -> CatalogSnapshot {
    Arc::from(tracks.to_vec())
}

fn rig_with(n: usize, settings: PlaybackSettings) -> Rig {
    let dir = tempdir().unwrap();
    let storage = dir.path().join("songs");
    let tracks = make_tracks(&storage, n);
    let device = FakeOutput::default();
    let remote = Recorder::default();
    let coordinator = Coordinator::new(
        device.clone(),
        remote.clone(),
        settings,
        storage.clone(),
        snapshot(&tracks),
    );
    Rig {
        _dir: dir,
        storage,
        tracks,
        device,
        remote,
        coordinator,
    }
}

fn rig(n: usize) -> Rig {
    rig_with(n, PlaybackSettings::default())
}

impl Rig {
    fn handle(&mut self, event: PlayerEvent) -> Result<(), PlayerError> {
        self.coordinator.handle(event)
    }

    fn index(&self) -> Option<usize> {
        self.coordinator.state().index
    }

    fn set_position(&self, secs: u64) {
        self.device.0.lock().unwrap().position = Duration::from_secs(secs);
    }

    fn play(&mut self, i: usize) {
        let id = self.tracks[i].id.clone();
        self.handle(PlayerEvent::Play(id)).unwrap();
    }

    fn remove(&mut self, i: usize) {
        self.tracks.remove(i);
        let snap = snapshot(&self.tracks);
        self.handle(PlayerEvent::CatalogChanged(snap)).unwrap();
    }
}

#[test]
fn play_loads_track_and_publishes_now_playing() {
    let mut r = rig(3);
    let id = r.tracks[1].id.clone();
    r.handle(PlayerEvent::Play(id.clone())).unwrap();

    let s = r.coordinator.state();
    assert_eq!(s.index, Some(1));
    assert_eq!(s.track_id.as_ref(), Some(&id));
    assert!(s.playing);
    assert_eq!(s.elapsed, Duration::ZERO);
    assert_eq!(s.total, Duration::from_secs(180));

    let Some(Remote::Published(info)) = r.remote.last() else {
        panic!("expected now-playing to be published");
    };
    assert_eq!(info.title, "Song 1");
    assert_eq!(info.artist, "Unknown Artist");
    assert!(info.playing);
    assert_eq!(info.path, r.storage.join("song1.mp3"));
}

#[test]
fn play_unknown_id_is_reported() {
    let mut r = rig(2);
    let err = r.handle(PlayerEvent::Play(TrackId::from("nope"))).unwrap_err();
    assert!(matches!(err, PlayerError::TrackNotFound(_)));
    assert!(!r.coordinator.state().is_loaded());
}

#[test]
fn only_one_session_is_open_at_a_time() {
    let mut r = rig(3);
    r.play(0);
    r.play(1);
    r.handle(PlayerEvent::SkipForward).unwrap();

    let d = r.device.0.lock().unwrap();
    assert_eq!(d.opened.len(), 3);
    assert_eq!(d.live, 1);
}

#[test]
fn missing_file_leaves_transport_stopped() {
    let mut r = rig(2);
    r.play(0);
    fs::remove_file(r.storage.join("song1.mp3")).unwrap();

    let id = r.tracks[1].id.clone();
    let err = r.handle(PlayerEvent::Play(id)).unwrap_err();
    assert!(matches!(err, PlayerError::ResourceUnavailable { .. }));
    assert!(!r.coordinator.state().is_loaded());
    assert!(!r.coordinator.state().playing);
    assert_eq!(r.device.0.lock().unwrap().live, 0);
    assert_eq!(r.remote.last(), Some(Remote::Cleared));
}

#[test]
fn decoder_rejection_leaves_transport_stopped() {
    let mut r = rig(2);
    r.device.0.lock().unwrap().reject = true;

    let id = r.tracks[0].id.clone();
    let err = r.handle(PlayerEvent::Play(id)).unwrap_err();
    assert!(matches!(err, PlayerError::Session { .. }));
    assert!(!r.coordinator.state().is_loaded());
}

#[test]
fn toggle_without_session_is_a_no_op() {
    let mut r = rig(2);
    r.handle(PlayerEvent::TogglePlayPause).unwrap();
    r.handle(PlayerEvent::SkipForward).unwrap();
    r.handle(PlayerEvent::SkipBack).unwrap();
    assert_eq!(r.coordinator.state().index, None);
    assert!(!r.coordinator.state().playing);
    assert!(r.device.0.lock().unwrap().opened.is_empty());
}

#[test]
fn toggle_pauses_and_resumes_session() {
    let mut r = rig(1);
    r.play(0);
    r.handle(PlayerEvent::TogglePlayPause).unwrap();
    assert!(!r.coordinator.state().playing);
    assert!(!r.device.0.lock().unwrap().playing);

    r.handle(PlayerEvent::TogglePlayPause).unwrap();
    assert!(r.coordinator.state().playing);
    assert!(r.device.0.lock().unwrap().playing);
}

#[test]
fn skip_forward_wraps_to_first() {
    let mut r = rig(3);
    r.play(2);
    r.handle(PlayerEvent::SkipForward).unwrap();
    assert_eq!(r.index(), Some(0));
}

#[test]
fn skip_back_near_start_goes_to_previous_with_wrap() {
    let mut r = rig(3);
    r.play(0);
    r.set_position(3);
    r.handle(PlayerEvent::SkipBack).unwrap();
    assert_eq!(r.index(), Some(2));

    // Exactly at the threshold still counts as near the start.
    r.set_position(5);
    r.handle(PlayerEvent::SkipBack).unwrap();
    assert_eq!(r.index(), Some(1));
}

#[test]
fn skip_back_later_in_track_restarts_it() {
    let mut r = rig(3);
    r.play(1);
    r.set_position(30);
    r.handle(PlayerEvent::SkipBack).unwrap();

    assert_eq!(r.index(), Some(1));
    assert_eq!(r.coordinator.state().elapsed, Duration::ZERO);
    assert_eq!(r.device.0.lock().unwrap().seeks, vec![Duration::ZERO]);
}

#[test]
fn stop_clears_transport_and_remote() {
    let mut r = rig(2);
    r.play(1);
    r.handle(PlayerEvent::Stop).unwrap();

    let s = r.coordinator.state();
    assert_eq!(s.index, None);
    assert_eq!(s.track_id, None);
    assert!(!s.playing);
    assert_eq!(r.remote.last(), Some(Remote::Cleared));
    assert_eq!(r.device.0.lock().unwrap().live, 0);
}

#[test]
fn finish_advances_or_repeats() {
    let mut r = rig(3);
    r.play(2);
    r.handle(PlayerEvent::PlaybackFinished { success: true }).unwrap();
    assert_eq!(r.index(), Some(0));

    r.handle(PlayerEvent::SetRepeat(true)).unwrap();
    r.handle(PlayerEvent::PlaybackFinished { success: true }).unwrap();
    assert_eq!(r.index(), Some(0));
    assert!(r.coordinator.state().playing);
    assert_eq!(r.device.0.lock().unwrap().opened.len(), 3);
}

#[test]
fn repeat_comes_from_settings() {
    let settings = PlaybackSettings {
        repeat: true,
        ..PlaybackSettings::default()
    };
    let mut r = rig_with(2, settings);
    assert!(r.coordinator.state().repeat);
    r.play(1);
    r.handle(PlayerEvent::PlaybackFinished { success: true }).unwrap();
    assert_eq!(r.index(), Some(1));
}

#[test]
fn failed_finish_tears_down_and_reports() {
    let mut r = rig(2);
    r.play(0);
    let err = r
        .handle(PlayerEvent::PlaybackFinished { success: false })
        .unwrap_err();
    assert!(matches!(err, PlayerError::Session { .. }));
    assert!(!r.coordinator.state().is_loaded());
    assert_eq!(r.device.0.lock().unwrap().live, 0);
}

#[test]
fn deleting_earlier_track_shifts_index_down() {
    let mut r = rig(4);
    let id = r.tracks[2].id.clone();
    r.play(2);

    r.remove(0);
    assert_eq!(r.index(), Some(1));
    assert_eq!(r.coordinator.state().track_id.as_ref(), Some(&id));
    assert!(r.coordinator.state().playing);
}

#[test]
fn deleting_later_track_keeps_index() {
    let mut r = rig(4);
    r.play(1);
    r.remove(3);
    assert_eq!(r.index(), Some(1));

    // Next still follows the new ordering.
    r.handle(PlayerEvent::SkipForward).unwrap();
    assert_eq!(r.index(), Some(2));
    assert_eq!(
        r.coordinator.state().track_id.as_ref(),
        Some(&r.tracks[2].id)
    );
}

#[test]
fn deleting_current_track_stops_playback() {
    let mut r = rig(3);
    r.play(1);
    r.remove(1);

    assert!(!r.coordinator.state().is_loaded());
    assert!(!r.coordinator.state().playing);
    assert_eq!(r.remote.last(), Some(Remote::Cleared));
    assert_eq!(r.device.0.lock().unwrap().live, 0);
}

#[test]
fn interruption_pauses_and_optionally_resumes() {
    let mut r = rig(1);
    r.play(0);

    r.handle(PlayerEvent::Interruption(Interruption::Began)).unwrap();
    assert!(!r.coordinator.state().playing);

    r.handle(PlayerEvent::Interruption(Interruption::Ended {
        should_resume: false,
    }))
    .unwrap();
    assert!(!r.coordinator.state().playing);

    r.handle(PlayerEvent::TogglePlayPause).unwrap();
    r.handle(PlayerEvent::Interruption(Interruption::Began)).unwrap();
    r.handle(PlayerEvent::Interruption(Interruption::Ended {
        should_resume: true,
    }))
    .unwrap();
    assert!(r.coordinator.state().playing);
    assert!(r.device.0.lock().unwrap().playing);
}

#[test]
fn interruption_end_leaves_user_paused_track_paused() {
    let mut r = rig(1);
    r.play(0);
    r.handle(PlayerEvent::Pause).unwrap();

    r.handle(PlayerEvent::Interruption(Interruption::Began)).unwrap();
    r.handle(PlayerEvent::Interruption(Interruption::Ended {
        should_resume: true,
    }))
    .unwrap();
    assert!(!r.coordinator.state().playing);
    assert!(r.coordinator.state().is_loaded());
}

#[test]
fn seek_clamps_and_end_of_track_advances() {
    let mut r = rig(2);
    r.play(0);

    r.handle(PlayerEvent::Seek(Duration::from_secs(60))).unwrap();
    assert_eq!(r.coordinator.state().elapsed, Duration::from_secs(60));

    r.handle(PlayerEvent::Seek(Duration::from_secs(500))).unwrap();
    assert_eq!(
        r.device.0.lock().unwrap().seeks.last(),
        Some(&Duration::from_secs(180))
    );
    assert_eq!(r.index(), Some(1));
}

#[test]
fn scrubbing_suspends_progress_polling() {
    let mut r = rig(1);
    r.play(0);
    r.handle(PlayerEvent::BeginScrub).unwrap();
    r.set_position(42);
    r.handle(PlayerEvent::Tick).unwrap();
    assert_eq!(r.coordinator.state().elapsed, Duration::ZERO);

    r.handle(PlayerEvent::EndScrub(Duration::from_secs(10))).unwrap();
    assert_eq!(r.coordinator.state().elapsed, Duration::from_secs(10));

    r.set_position(11);
    r.handle(PlayerEvent::Tick).unwrap();
    assert_eq!(r.coordinator.state().elapsed, Duration::from_secs(11));
}

#[test]
fn tick_advances_when_session_drains() {
    let mut r = rig(2);
    r.play(0);
    r.device.0.lock().unwrap().finished = true;
    r.handle(PlayerEvent::Tick).unwrap();
    assert_eq!(r.index(), Some(1));
}

#[test]
fn subscribers_see_each_transition() {
    let mut r = rig(2);
    let rx = r.coordinator.subscribe();
    r.play(0);
    r.handle(PlayerEvent::Pause).unwrap();

    let states: Vec<TransportState> = rx.try_iter().collect();
    assert_eq!(states.len(), 3);
    assert!(!states[0].is_loaded());
    assert!(states[1].playing);
    assert_eq!(states[2].index, Some(0));
    assert!(!states[2].playing);
}

#[test]
fn shuffle_cycle_visits_every_track_once() {
    let mut r = rig(5);
    r.play(3);
    r.handle(PlayerEvent::ToggleShuffle).unwrap();
    assert!(r.coordinator.state().shuffle);
    assert_eq!(r.coordinator.order()[0], 3);

    let mut seen = vec![3];
    for _ in 0..4 {
        r.handle(PlayerEvent::SkipForward).unwrap();
        seen.push(r.index().unwrap());
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4]);

    r.handle(PlayerEvent::SkipForward).unwrap();
    assert_eq!(r.index(), Some(3));
}

#[test]
fn player_thread_runs_coordinator_and_quits() {
    let dir = tempdir().unwrap();
    let storage = dir.path().join("songs");
    let tracks = make_tracks(&storage, 2);
    let device = FakeOutput::default();
    let (err_tx, err_rx) = mpsc::channel();

    let output = device.clone();
    let handle = PlayerHandle::spawn(
        move || Ok(output),
        Recorder::default(),
        PlaybackSettings::default(),
        storage,
        snapshot(&tracks),
        err_tx,
    )
    .unwrap();

    let states = handle.subscribe();
    handle.send(PlayerEvent::Play(tracks[1].id.clone()));
    handle.send(PlayerEvent::Play(TrackId::from("missing")));

    let playing = states
        .iter()
        .find(|s| s.playing)
        .expect("a playing state");
    assert_eq!(playing.index, Some(1));

    let err = err_rx.recv_timeout(Duration::from_secs(2)).unwrap();
    assert!(matches!(err, PlayerError::TrackNotFound(_)));

    handle.quit_softly(Duration::ZERO);
    assert_eq!(device.0.lock().unwrap().live, 0);
}

#[test]
fn player_thread_reports_output_failure() {
    let (err_tx, _err_rx) = mpsc::channel();
    let result = PlayerHandle::spawn(
        || -> Result<FakeOutput, PlayerError> {
            Err(PlayerError::Session {
                path: PathBuf::from("device"),
                message: "no device".to_string(),
            })
        },
        Recorder::default(),
        PlaybackSettings::default(),
        PathBuf::from("/nonexistent"),
        snapshot(&[]),
        err_tx,
    );
    assert!(result.is_err());
}
