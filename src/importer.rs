//! Copy user-chosen audio files into private storage and catalog them.
//!
//! Each path is an independent unit: one failing file never aborts the rest
//! of the batch. Re-running a batch is idempotent since both the copy and the
//! insert dedup on the file name.

mod access;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::error::{LibraryError, LibraryResult};
use crate::jobs::CancelToken;
use crate::library::{InsertOutcome, Library, Track};
use crate::tags::read_tags;

use access::ScopedAccess;

#[derive(Debug)]
pub struct ImportFailure {
    pub path: PathBuf,
    pub error: LibraryError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<Track>,
    pub duplicates: Vec<Track>,
    pub failures: Vec<ImportFailure>,
    /// Paths left untouched because the batch was cancelled.
    pub skipped: Vec<PathBuf>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("imported {}", self.imported.len())];
        if !self.duplicates.is_empty() {
            parts.push(format!("{} already in library", self.duplicates.len()));
        }
        if !self.failures.is_empty() {
            parts.push(format!("{} failed", self.failures.len()));
        }
        if !self.skipped.is_empty() {
            parts.push(format!("{} skipped", self.skipped.len()));
        }
        parts.join(", ")
    }
}

fn is_audio_file(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Expand directories into the audio files below them; plain files pass through.
pub fn expand_paths(paths: &[PathBuf], settings: &LibrarySettings) -> Vec<PathBuf> {
    let exts = settings.normalized_extensions();
    let mut out = Vec::new();

    for path in paths {
        if !path.is_dir() {
            out.push(path.clone());
            continue;
        }

        let mut found: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(settings.follow_links)
            .into_iter()
            .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
            .filter_map(Result::ok)
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_audio_file(p, &exts))
            .collect();
        found.sort();
        out.extend(found);
    }

    out
}

/// Import every path, recording per-file outcomes.
pub fn import(
    library: &Library,
    settings: &LibrarySettings,
    paths: &[PathBuf],
    cancel: &CancelToken,
) -> ImportReport {
    let mut report = ImportReport::default();
    let files = expand_paths(paths, settings);
    let exts = settings.normalized_extensions();

    for (i, path) in files.iter().enumerate() {
        if cancel.is_cancelled() {
            report.skipped.extend(files[i..].iter().cloned());
            info!("import cancelled, {} file(s) skipped", files.len() - i);
            break;
        }

        match import_one(library, &exts, path) {
            Ok(InsertOutcome::Inserted(track)) => report.imported.push(track),
            Ok(InsertOutcome::Duplicate(track)) => {
                debug!("{:?} already catalogued as {}", path, track.id);
                report.duplicates.push(track);
            }
            Err(error) => {
                warn!("failed to import {:?}: {error}", path);
                report.failures.push(ImportFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    info!("import finished: {}", report.summary());
    report
}

fn import_one(library: &Library, exts: &[String], path: &Path) -> LibraryResult<InsertOutcome> {
    if !is_audio_file(path, exts) {
        return Err(LibraryError::FormatUnsupported {
            extension: extension_of(path).unwrap_or_default(),
        });
    }
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| LibraryError::ResourceUnavailable {
            path: path.to_path_buf(),
            source: None,
        })?;

    let mut access = ScopedAccess::acquire(path)?;

    if let Some(existing) = library.find_by_file_ref(&file_name)? {
        return Ok(InsertOutcome::Duplicate(existing));
    }

    let dest = library.storage_dir().join(&file_name);
    if !dest.exists() {
        copy_into_storage(&mut access, library.storage_dir(), &dest)?;
    }

    let mut track = Track::new(file_stem(path).unwrap_or_else(|| file_name.clone()), file_name);
    track.file_extension = extension_of(path).map(|e| e.to_ascii_uppercase());
    track.size = Some(access.metadata().len());
    track.created_at = access
        .metadata()
        .created()
        .or_else(|_| access.metadata().modified())
        .ok()
        .map(DateTime::<Utc>::from);

    match read_tags(&dest) {
        Ok(tags) => {
            if let Some(title) = tags.title {
                track.title = title;
            }
            track.artist = tags.artist;
            track.album = tags.album;
            track.cover_art = tags.cover_art;
            track.duration = tags.duration;
        }
        Err(e) => debug!("no readable tags in {:?}: {e}", dest),
    }

    drop(access);
    library.insert(track)
}

/// Copy through a hidden temporary file and rename it into place, so `dest`
/// only ever appears complete.
fn copy_into_storage(access: &mut ScopedAccess, storage_dir: &Path, dest: &Path) -> LibraryResult<()> {
    fs::create_dir_all(storage_dir).map_err(|e| LibraryError::io(storage_dir, e))?;

    let name = dest
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("import");
    let tmp = storage_dir.join(format!(".{name}.{}.part", uuid::Uuid::new_v4()));

    let result = (|| -> io::Result<()> {
        let mut out = File::create(&tmp)?;
        io::copy(access.file_mut(), &mut out)?;
        out.sync_all()?;
        fs::rename(&tmp, dest)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp);
        return Err(LibraryError::io(access.path(), e));
    }
    debug!("copied {:?} -> {:?}", access.path(), dest);
    Ok(())
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_string)
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests;
