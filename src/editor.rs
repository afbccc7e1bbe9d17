//! Metadata editing: update a catalog record and, where the format carries an
//! ID3 tag block, the backing file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::EditorSettings;
use crate::error::{LibraryError, LibraryResult};
use crate::jobs::CancelToken;
use crate::library::{Library, Track, TrackId};
use crate::tags::{TrackEdit, write_id3};

#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub track: Track,
    /// Whether the backing file's tag block was rewritten.
    pub file_rewritten: bool,
    /// Set when the format has no tag support and only the record changed.
    pub skipped_format: Option<String>,
}

/// Apply `edit` to the record `id`.
///
/// The record is re-read by id under the library's write lock and stays
/// locked until the record is updated, so a concurrent delete cannot remove
/// the file mid-rewrite. For taggable formats the file is rewritten before
/// the record is updated; a failed rewrite leaves both untouched. A blank
/// title keeps the current one.
pub fn edit(
    library: &Library,
    settings: &EditorSettings,
    id: &TrackId,
    edit: TrackEdit,
    cancel: &CancelToken,
) -> LibraryResult<EditOutcome> {
    if cancel.is_cancelled() {
        return Err(LibraryError::Cancelled);
    }

    let mut file_rewritten = false;
    let mut skipped_format = None;

    let track = library.modify(id, |path, current| {
        let edit = TrackEdit {
            title: title_or_fallback(&edit.title, &current),
            ..edit
        };
        let extension = current
            .file_extension
            .clone()
            .or_else(|| {
                Path::new(&current.file_ref)
                    .extension()
                    .and_then(|s| s.to_str())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        if settings.is_taggable(&extension) {
            rewrite_tags(path, &edit, cancel)?;
            file_rewritten = true;
        } else {
            let err = LibraryError::FormatUnsupported {
                extension: extension.clone(),
            };
            debug!("skipping tag rewrite for {}: {err}", current.file_ref);
            skipped_format = Some(extension);
        }

        let mut updated = current;
        updated.title = edit.title;
        updated.artist = non_empty(edit.artist);
        updated.album = non_empty(edit.album);
        updated.cover_art = edit.cover_art.filter(|d| !d.is_empty());
        if file_rewritten {
            if let Ok(meta) = fs::metadata(path) {
                updated.size = Some(meta.len());
            }
        }
        Ok(updated)
    })?;
    info!(id = %track.id, file_rewritten, "edited track metadata");

    Ok(EditOutcome {
        track,
        file_rewritten,
        skipped_format,
    })
}

/// The trimmed new title, or the current one (then the file stem) when blank.
fn title_or_fallback(title: &str, current: &Track) -> String {
    let title = title.trim();
    if !title.is_empty() {
        return title.to_string();
    }
    if !current.title.trim().is_empty() {
        return current.title.clone();
    }
    Path::new(&current.file_ref)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(&current.file_ref)
        .to_string()
}

/// Write the new tag into a hidden sibling copy, then rename it over the
/// original. Only the complete file is ever reachable under the real name.
fn rewrite_tags(path: &Path, edit: &TrackEdit, cancel: &CancelToken) -> LibraryResult<()> {
    if !path.exists() {
        return Err(LibraryError::ResourceUnavailable {
            path: path.to_path_buf(),
            source: None,
        });
    }

    let tmp = temp_sibling(path);
    let result = (|| {
        fs::copy(path, &tmp).map_err(|e| LibraryError::io(path, e))?;
        write_id3(&tmp, edit).map_err(|e| LibraryError::Tag {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if cancel.is_cancelled() {
            return Err(LibraryError::Cancelled);
        }
        fs::rename(&tmp, path).map_err(|e| LibraryError::io(path, e))
    })();

    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("track");
    path.with_file_name(format!(".{name}.{}.edit", uuid::Uuid::new_v4()))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests;
