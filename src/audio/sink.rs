//! `rodio` implementation of the output seams.
//!
//! A session wraps one `Sink` on the shared output mixer. Seeking prefers
//! `Sink::try_seek`; formats that cannot seek get a rebuilt sink that skips
//! into the file instead.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use tracing::debug;

use crate::error::PlayerError;

use super::types::{AudioOutput, OutputSession};

pub struct RodioOutput {
    stream: OutputStream,
}

impl RodioOutput {
    /// Open the default output device.
    pub fn open_default() -> Result<Self, PlayerError> {
        let mut stream =
            OutputStreamBuilder::open_default_stream().map_err(|e| PlayerError::Session {
                path: PathBuf::from("<default output device>"),
                message: e.to_string(),
            })?;
        // rodio logs to stderr when OutputStream is dropped; that would draw over the TUI.
        stream.log_on_drop(false);
        Ok(Self { stream })
    }
}

fn decode(path: &Path) -> Result<Decoder<BufReader<File>>, PlayerError> {
    let file = File::open(path).map_err(|_| PlayerError::ResourceUnavailable {
        path: path.to_path_buf(),
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| PlayerError::Session {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Create a paused `Sink` for `path` that starts playback at `start_at`.
fn create_sink_at(
    mixer: &Mixer,
    path: &Path,
    start_at: Duration,
) -> Result<(Sink, Option<Duration>), PlayerError> {
    let source = decode(path)?;
    let total = source.total_duration();

    let sink = Sink::connect_new(mixer);
    // `skip_duration` is the fallback seeking primitive; Duration::ZERO is fine.
    sink.append(source.skip_duration(start_at));
    sink.pause();
    Ok((sink, total))
}

impl AudioOutput for RodioOutput {
    type Session = RodioSession;

    fn open(&mut self, path: &Path) -> Result<RodioSession, PlayerError> {
        let mixer = self.stream.mixer().clone();
        let (sink, duration) = create_sink_at(&mixer, path, Duration::ZERO)?;
        Ok(RodioSession {
            mixer,
            path: path.to_path_buf(),
            sink,
            duration,
            offset: Duration::ZERO,
            paused: true,
        })
    }
}

pub struct RodioSession {
    mixer: Mixer,
    path: PathBuf,
    sink: Sink,
    duration: Option<Duration>,
    /// Position skipped into the file when the sink had to be rebuilt.
    offset: Duration,
    paused: bool,
}

impl OutputSession for RodioSession {
    fn play(&mut self) {
        self.sink.play();
        self.paused = false;
    }

    fn pause(&mut self) {
        self.sink.pause();
        self.paused = true;
    }

    fn seek(&mut self, to: Duration) -> Result<(), PlayerError> {
        if self.offset.is_zero() && self.sink.try_seek(to).is_ok() {
            return Ok(());
        }

        debug!("rebuilding sink to seek {:?} in {:?}", to, self.path);
        let volume = self.sink.volume();
        let (sink, _) = create_sink_at(&self.mixer, &self.path, to)?;
        sink.set_volume(volume);
        if !self.paused {
            sink.play();
        }
        self.sink.stop();
        self.sink = sink;
        self.offset = to;
        Ok(())
    }

    fn position(&self) -> Duration {
        self.offset + self.sink.get_pos()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

impl Drop for RodioSession {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
