use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `WAVES__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("WAVES")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("library.extensions")
                .with_list_parse_key("editor.taggable_extensions")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.playback.tick_ms == 0 {
            return Err("playback.tick_ms must be >= 1".to_string());
        }
        if self.library.normalized_extensions().is_empty() {
            return Err("library.extensions must name at least one extension".to_string());
        }
        Ok(())
    }

    /// Directory holding the catalog database, imported songs and cached art.
    pub fn data_dir(&self) -> PathBuf {
        self.library
            .data_dir
            .clone()
            .or_else(default_data_dir)
            .unwrap_or_else(|| PathBuf::from(".waves"))
    }

    /// Private storage for imported audio files.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir().join("songs")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir().join("catalog.db")
    }

    pub fn art_dir(&self) -> PathBuf {
        self.data_dir().join("art")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log
            .file
            .clone()
            .unwrap_or_else(|| self.data_dir().join("waves.log"))
    }
}

/// Resolve the config path from `WAVES_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("WAVES_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/waves/config.toml`
/// or `~/.config/waves/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("waves").join("config.toml"))
}

/// `$XDG_DATA_HOME/waves` or `~/.local/share/waves`.
pub fn default_data_dir() -> Option<PathBuf> {
    let data_home = if let Some(xdg) = env::var_os("XDG_DATA_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("share"))
    };

    data_home.map(|d| d.join("waves"))
}
