use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::audio::AudioOutput;
use crate::config::PlaybackSettings;
use crate::error::PlayerError;
use crate::library::CatalogSnapshot;
use crate::mpris::NowPlaying;

use super::coordinator::Coordinator;
use super::types::{PlayerCmd, PlayerEvent, TransportState};

/// Owner side of the player thread.
pub struct PlayerHandle {
    tx: Sender<PlayerCmd>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl PlayerHandle {
    /// Start the player thread. The output is opened on that thread (audio
    /// streams are not `Send`); if that fails the error is returned here.
    ///
    /// Errors from later events are forwarded to `errors`.
    pub fn spawn<O, N, F>(
        open_output: F,
        remote: N,
        settings: PlaybackSettings,
        storage_dir: PathBuf,
        tracks: CatalogSnapshot,
        errors: Sender<PlayerError>,
    ) -> Result<Self, PlayerError>
    where
        O: AudioOutput + 'static,
        N: NowPlaying + Send + 'static,
        F: FnOnce() -> Result<O, PlayerError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PlayerCmd>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<(), PlayerError>>(1);

        let handle = thread::spawn(move || {
            let output = match open_output() {
                Ok(o) => {
                    let _ = ready_tx.send(Ok(()));
                    o
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            let tick = Duration::from_millis(settings.tick_ms.max(1));
            let coordinator = Coordinator::new(output, remote, settings, storage_dir, tracks);
            run(coordinator, rx, tick, errors);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                tx,
                join: Mutex::new(Some(handle)),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(PlayerError::Session {
                    path: PathBuf::new(),
                    message: "player thread exited during startup".to_string(),
                })
            }
        }
    }

    /// A sender other components (catalog listener, remote controls) can own.
    pub fn sender(&self) -> Sender<PlayerCmd> {
        self.tx.clone()
    }

    pub fn send(&self, event: PlayerEvent) {
        if self.tx.send(PlayerCmd::Event(event)).is_err() {
            warn!("player thread is gone; dropping event");
        }
    }

    pub fn subscribe(&self) -> Receiver<TransportState> {
        let (tx, rx) = mpsc::channel();
        let _ = self.tx.send(PlayerCmd::Subscribe(tx));
        rx
    }

    /// Fade out, stop and wait for the player thread.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.tx.send(PlayerCmd::Quit {
            fade_out_ms: u64::try_from(fade_out.as_millis()).unwrap_or(u64::MAX),
        });

        if let Ok(mut j) = self.join.lock() {
            if let Some(h) = j.take() {
                let _ = h.join();
            }
        }
    }
}

fn run<O: AudioOutput, N: NowPlaying>(
    mut coordinator: Coordinator<O, N>,
    rx: Receiver<PlayerCmd>,
    tick: Duration,
    errors: Sender<PlayerError>,
) {
    loop {
        let event = match rx.recv_timeout(tick) {
            Ok(PlayerCmd::Event(e)) => e,
            Ok(PlayerCmd::Subscribe(tx)) => {
                coordinator.add_subscriber(tx);
                continue;
            }
            Ok(PlayerCmd::Quit { fade_out_ms }) => {
                coordinator.shutdown(Duration::from_millis(fade_out_ms));
                break;
            }
            Err(RecvTimeoutError::Timeout) => PlayerEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => {
                coordinator.shutdown(Duration::ZERO);
                break;
            }
        };

        if let Err(e) = coordinator.handle(event) {
            error!("playback error: {e}");
            let _ = errors.send(e);
        }
    }
    debug!("player thread exiting");
}
