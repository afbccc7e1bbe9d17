use std::fs::{File, Metadata};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::error::{LibraryError, LibraryResult};

/// Read access to a user-chosen file for the duration of an import.
///
/// Access is acquired by opening the file and released when the guard drops.
/// The open handle is what gets copied, so the import keeps working even if
/// the source is renamed mid-copy.
pub struct ScopedAccess {
    path: PathBuf,
    file: File,
    metadata: Metadata,
}

impl ScopedAccess {
    pub fn acquire(path: &Path) -> LibraryResult<Self> {
        let file = File::open(path).map_err(|e| LibraryError::io(path, e))?;
        let metadata = file.metadata().map_err(|e| LibraryError::io(path, e))?;
        if !metadata.is_file() {
            return Err(LibraryError::ResourceUnavailable {
                path: path.to_path_buf(),
                source: None,
            });
        }
        trace!("acquired access to {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
            file,
            metadata,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn file_mut(&mut self) -> &mut File {
        &mut self.file
    }
}

impl Drop for ScopedAccess {
    fn drop(&mut self) {
        trace!("released access to {:?}", self.path);
    }
}
