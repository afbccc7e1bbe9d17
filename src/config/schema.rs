use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/waves/config.toml` or `~/.config/waves/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `WAVES__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub playback: PlaybackSettings,
    pub controls: ControlsSettings,
    pub audio: AudioSettings,
    pub editor: EditorSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Root of the private storage. `None` resolves to the XDG data dir.
    pub data_dir: Option<PathBuf>,
    /// File extensions accepted by the importer (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether directory imports descend into dotfiles.
    pub include_hidden: bool,
    /// Whether directory imports follow symlinks.
    pub follow_links: bool,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            extensions: vec![
                "mp3".into(),
                "flac".into(),
                "wav".into(),
                "ogg".into(),
                "m4a".into(),
            ],
            include_hidden: false,
            follow_links: true,
        }
    }
}

impl LibrarySettings {
    /// Lower-cased extensions with leading dots stripped.
    pub fn normalized_extensions(&self) -> Vec<String> {
        normalize_extensions(&self.extensions)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether repeat-one starts enabled.
    pub repeat: bool,
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Skipping back within this many seconds moves to the previous track;
    /// later it restarts the current one.
    pub restart_threshold_secs: u64,
    /// Progress polling interval (milliseconds).
    pub tick_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            repeat: false,
            shuffle: false,
            restart_threshold_secs: 5,
            tick_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Number of seconds to scrub when pressing `H` / `L`.
    pub scrub_seconds: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self { scrub_seconds: 5 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            quit_fade_out_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EditorSettings {
    /// Extensions whose files carry an ID3 tag block that edits are written into.
    /// Other formats only get their catalog record updated.
    pub taggable_extensions: Vec<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            taggable_extensions: vec!["mp3".into()],
        }
    }
}

impl EditorSettings {
    pub fn is_taggable(&self, extension: &str) -> bool {
        let ext = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        normalize_extensions(&self.taggable_extensions)
            .iter()
            .any(|e| e == &ext)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default filter directive, overridden by `WAVES_LOG`.
    pub level: String,
    /// Log file used while the TUI owns the terminal.
    /// `None` resolves to `<data_dir>/waves.log`.
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

fn normalize_extensions(exts: &[String]) -> Vec<String> {
    exts.iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
