use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Opaque primary key of a catalog record; stable across edits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for TrackId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TrackId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover_art: Option<Vec<u8>>,
    pub duration: Option<Duration>,
    /// File name inside the private storage directory.
    pub file_ref: String,
    /// Upper-case extension, e.g. `MP3`.
    pub file_extension: Option<String>,
    pub size: Option<u64>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Track {
    /// A record for `file_ref` with no metadata other than its title.
    pub fn new(title: impl Into<String>, file_ref: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            title: title.into(),
            artist: None,
            album: None,
            cover_art: None,
            duration: None,
            file_ref: file_ref.into(),
            file_extension: None,
            size: None,
            created_at: None,
        }
    }
}

/// Immutable view of the catalog in its live ordering (oldest import first).
pub type CatalogSnapshot = Arc<[Track]>;

/// Position of `id` in `tracks`, if present.
pub fn position_of(tracks: &[Track], id: &TrackId) -> Option<usize> {
    tracks.iter().position(|t| &t.id == id)
}
