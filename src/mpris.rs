//! Now-playing surface: the `NowPlaying` seam the coordinator pushes to, and
//! its MPRIS implementation on the session bus.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedObjectPath, OwnedValue, Value};

use crate::library::{Track, TrackId};
use crate::tags::art_extension;

const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";
const UNKNOWN_ARTIST: &str = "Unknown Artist";
const UNKNOWN_ALBUM: &str = "Unknown Album";

/// What the system media surface shows for the loaded track.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlayingInfo {
    pub track_id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Duration,
    pub elapsed: Duration,
    pub playing: bool,
    pub art: Option<Arc<[u8]>>,
    pub path: PathBuf,
    pub repeat: bool,
    pub shuffle: bool,
}

impl NowPlayingInfo {
    pub fn for_track(track: &Track, path: PathBuf) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track
                .artist
                .clone()
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            album: track
                .album
                .clone()
                .unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            duration: track.duration.unwrap_or_default(),
            elapsed: Duration::ZERO,
            playing: false,
            art: track.cover_art.as_deref().map(Arc::from),
            path,
            repeat: false,
            shuffle: false,
        }
    }
}

pub trait NowPlaying {
    fn publish(&mut self, info: &NowPlayingInfo);
    fn clear(&mut self);
}

/// Requests arriving from remote controls (media keys, `playerctl`, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
    /// Relative offset in microseconds.
    Seek(i64),
    /// Absolute position in microseconds.
    SetPosition(i64),
    SetRepeat(bool),
    SetShuffle(bool),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PlaybackStatus {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Default)]
struct SharedState {
    playback: PlaybackStatus,
    current: Option<TrackId>,
    track_path: Option<String>,
    title: Option<String>,
    artist: Vec<String>,
    album: Option<String>,
    url: Option<String>,
    art_url: Option<String>,
    length_micros: Option<i64>,
    position_micros: i64,
    repeat: bool,
    shuffle: bool,
}

pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
    notify: Sender<()>,
    art_dir: Option<PathBuf>,
}

/// Object paths only allow `[A-Za-z0-9_]` segments.
fn track_object_path(id: &TrackId) -> String {
    let segment: String = id
        .as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{OBJECT_PATH}/track/{segment}")
}

fn micros(d: Duration) -> i64 {
    i64::try_from(d.as_micros()).unwrap_or(i64::MAX)
}

/// Write artwork for `id` into `dir` unless it is already there.
fn cache_art(dir: &Path, id: &TrackId, bytes: &[u8]) -> Option<PathBuf> {
    let path = dir.join(format!("{}.{}", id, art_extension(bytes)));
    if path.exists() {
        return Some(path);
    }
    if let Err(e) = fs::create_dir_all(dir).and_then(|_| fs::write(&path, bytes)) {
        warn!("failed to cache artwork at {}: {e}", path.display());
        return None;
    }
    Some(path)
}

impl NowPlaying for MprisHandle {
    fn publish(&mut self, info: &NowPlayingInfo) {
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        let mut changed = false;

        if s.current.as_ref() != Some(&info.track_id) {
            s.current = Some(info.track_id.clone());
            s.track_path = Some(track_object_path(&info.track_id));
            s.title = Some(info.title.clone());
            s.artist = vec![info.artist.clone()];
            s.album = Some(info.album.clone());
            s.url = Some(format!("file://{}", info.path.display()));
            s.art_url = match (&self.art_dir, &info.art) {
                (Some(dir), Some(bytes)) => cache_art(dir, &info.track_id, bytes)
                    .map(|p| format!("file://{}", p.display())),
                _ => None,
            };
            changed = true;
        }

        let length = (!info.duration.is_zero()).then(|| micros(info.duration));
        if s.length_micros != length {
            s.length_micros = length;
            changed = true;
        }

        let playback = if info.playing {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Paused
        };
        if s.playback != playback {
            s.playback = playback;
            changed = true;
        }

        if s.repeat != info.repeat || s.shuffle != info.shuffle {
            s.repeat = info.repeat;
            s.shuffle = info.shuffle;
            changed = true;
        }

        // Position is polled by clients; it is not signalled.
        s.position_micros = micros(info.elapsed);

        drop(s);
        if changed {
            let _ = self.notify.send(());
        }
    }

    fn clear(&mut self) {
        if let Ok(mut s) = self.state.lock() {
            // Repeat and shuffle outlive the loaded track.
            let (repeat, shuffle) = (s.repeat, s.shuffle);
            *s = SharedState {
                repeat,
                shuffle,
                ..SharedState::default()
            };
        }
        let _ = self.notify.send(());
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "waves"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec!["file".to_string()]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

fn owned<'a>(value: impl Into<Value<'a>>) -> Option<OwnedValue> {
    OwnedValue::try_from(value.into()).ok()
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    fn seek(&self, offset: i64) {
        let _ = self.tx.send(ControlCmd::Seek(offset));
    }

    fn set_position(&self, track_id: OwnedObjectPath, position: i64) {
        let current = self.state.lock().ok().and_then(|s| s.track_path.clone());
        // Stale requests for a track that is no longer loaded are ignored.
        if current.as_deref() != Some(track_id.as_str()) {
            debug!("ignoring SetPosition for {}", track_id.as_str());
            return;
        }
        let _ = self.tx.send(ControlCmd::SetPosition(position));
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        let Ok(s) = self.state.lock() else {
            return "Stopped";
        };
        match s.playback {
            PlaybackStatus::Stopped => "Stopped",
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
        }
    }

    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state.lock().map(|s| s.position_micros).unwrap_or(0)
    }

    /// Repeat maps to `Track`; without it playback wraps through the library.
    #[zbus(property)]
    fn loop_status(&self) -> &str {
        match self.state.lock() {
            Ok(s) if s.repeat => "Track",
            _ => "Playlist",
        }
    }

    #[zbus(property)]
    fn set_loop_status(&mut self, value: String) {
        let _ = self.tx.send(ControlCmd::SetRepeat(value == "Track"));
    }

    #[zbus(property)]
    fn shuffle(&self) -> bool {
        self.state.lock().map(|s| s.shuffle).unwrap_or(false)
    }

    #[zbus(property)]
    fn set_shuffle(&mut self, value: bool) {
        let _ = self.tx.send(ControlCmd::SetShuffle(value));
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        let mut put = |key: &str, value: Option<OwnedValue>| {
            if let Some(v) = value {
                map.insert(key.to_string(), v);
            }
        };

        put(
            "mpris:trackid",
            s.track_path
                .as_deref()
                .and_then(|p| ObjectPath::try_from(p).ok())
                .and_then(owned),
        );
        put("xesam:title", s.title.clone().and_then(owned));
        if !s.artist.is_empty() {
            put("xesam:artist", owned(s.artist.clone()));
        }
        put("xesam:album", s.album.clone().and_then(owned));
        put("xesam:url", s.url.clone().and_then(owned));
        put("mpris:artUrl", s.art_url.clone().and_then(owned));
        put("mpris:length", s.length_micros.and_then(owned));
        map
    }
}

async fn serve(
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
    notify: Receiver<()>,
) -> zbus::Result<()> {
    let connection = Connection::session().await?;
    connection
        .request_name("org.mpris.MediaPlayer2.waves")
        .await?;

    let object_server = connection.object_server();
    object_server
        .at(OBJECT_PATH, RootIface { tx: tx.clone() })
        .await?;
    object_server
        .at(OBJECT_PATH, PlayerIface { tx, state })
        .await?;

    let iface_ref = object_server
        .interface::<_, PlayerIface>(OBJECT_PATH)
        .await?;

    loop {
        Timer::after(Duration::from_millis(100)).await;

        let mut changed = false;
        loop {
            match notify.try_recv() {
                Ok(()) => changed = true,
                Err(TryRecvError::Empty) => break,
                // Handle dropped: the player is gone.
                Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
        if !changed {
            continue;
        }

        let iface = iface_ref.get().await;
        let emitter = iface_ref.signal_emitter();
        if let Err(e) = iface.metadata_changed(emitter).await {
            debug!("MPRIS: metadata signal failed: {e}");
        }
        if let Err(e) = iface.playback_status_changed(emitter).await {
            debug!("MPRIS: playback status signal failed: {e}");
        }
        if let Err(e) = iface.loop_status_changed(emitter).await {
            debug!("MPRIS: loop status signal failed: {e}");
        }
        if let Err(e) = iface.shuffle_changed(emitter).await {
            debug!("MPRIS: shuffle signal failed: {e}");
        }
    }
}

/// Register the MPRIS service on its own thread. Failure to reach the session
/// bus is logged and leaves the returned handle working as a silent sink.
pub fn spawn_mpris(tx: Sender<ControlCmd>, art_dir: Option<PathBuf>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState::default()));
    let (notify_tx, notify_rx) = mpsc::channel();

    let state_for_thread = state.clone();
    std::thread::spawn(move || {
        if let Err(e) = block_on(serve(tx, state_for_thread, notify_rx)) {
            warn!("MPRIS unavailable: {e}");
        }
    });

    MprisHandle {
        state,
        notify: notify_tx,
        art_dir,
    }
}
