use crate::config;

/// Load settings, falling back to defaults when the config is broken.
///
/// Logging is not up yet when this runs, so the reason for a fallback is
/// returned for the caller to log once it is.
pub fn load_settings() -> (config::Settings, Option<String>) {
    match config::Settings::load() {
        Ok(s) => match s.validate() {
            Ok(()) => (s, None),
            Err(msg) => (
                config::Settings::default(),
                Some(format!("invalid config, using defaults: {msg}")),
            ),
        },
        // Config is optional; failures should not prevent the app from starting.
        Err(e) => (
            config::Settings::default(),
            Some(format!("failed to load config, using defaults: {e}")),
        ),
    }
}
