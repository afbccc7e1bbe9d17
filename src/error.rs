//! Error taxonomy shared by the library, importer, editor and player.
//!
//! The variants map onto how the presentation layer reacts: missing files and
//! decoder failures become a dismissible notice, an unsupported format only
//! skips the tag rewrite, and persistence failures have already been retried.

use std::path::PathBuf;

use thiserror::Error;

use crate::library::TrackId;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("file unavailable: {}", path.display())]
    ResourceUnavailable {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("unsupported format: {extension}")]
    FormatUnsupported { extension: String },

    #[error("catalog write failed: {0}")]
    Persistence(#[from] rusqlite::Error),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tag error on {}: {message}", path.display())]
    Tag { path: PathBuf, message: String },

    #[error("no track with id {0}")]
    NotFound(TrackId),

    #[error("operation cancelled")]
    Cancelled,
}

impl LibraryError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::ResourceUnavailable {
                path,
                source: Some(source),
            }
        } else {
            Self::Io { path, source }
        }
    }

    /// Whether the presentation layer should show this as a notice.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, Self::FormatUnsupported { .. } | Self::Cancelled)
    }
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("file unavailable: {}", path.display())]
    ResourceUnavailable { path: PathBuf },

    #[error("cannot play {}: {message}", path.display())]
    Session { path: PathBuf, message: String },

    #[error("no track with id {0}")]
    TrackNotFound(TrackId),

    #[error("no track at position {0}")]
    IndexOutOfRange(usize),
}

pub type LibraryResult<T> = Result<T, LibraryError>;
