use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::error::{LibraryError, LibraryResult};

use super::model::{CatalogSnapshot, Track, TrackId};
use super::store::{CatalogStore, InsertOutcome};

type ChangeListener = Box<dyn Fn(CatalogSnapshot) + Send + Sync>;

/// The catalog plus the private storage directory it resolves file refs against.
///
/// Every mutation runs under a single write lock and publishes a fresh
/// [`CatalogSnapshot`] to the registered listeners before the lock is
/// released, so listeners see mutations in commit order.
pub struct Library {
    store: Arc<dyn CatalogStore>,
    storage_dir: PathBuf,
    write_lock: Mutex<()>,
    listeners: Mutex<Vec<ChangeListener>>,
}

impl Library {
    pub fn new(store: Arc<dyn CatalogStore>, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            storage_dir: storage_dir.into(),
            write_lock: Mutex::new(()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Absolute location of the track's backing file.
    pub fn resolve(&self, track: &Track) -> PathBuf {
        self.storage_dir.join(&track.file_ref)
    }

    /// Register a listener called with the new snapshot after every mutation.
    pub fn on_change(&self, listener: impl Fn(CatalogSnapshot) + Send + Sync + 'static) {
        lock(&self.listeners).push(Box::new(listener));
    }

    pub fn snapshot(&self) -> LibraryResult<CatalogSnapshot> {
        Ok(self.store.list()?.into())
    }

    pub fn get(&self, id: &TrackId) -> LibraryResult<Option<Track>> {
        self.store.get(id)
    }

    pub fn find_by_file_ref(&self, file_ref: &str) -> LibraryResult<Option<Track>> {
        self.store.find_by_file_ref(file_ref)
    }

    pub fn insert(&self, track: Track) -> LibraryResult<InsertOutcome> {
        let _guard = lock(&self.write_lock);
        let outcome = self.store.insert(track)?;
        if let InsertOutcome::Inserted(ref t) = outcome {
            info!(id = %t.id, file = %t.file_ref, "catalogued track");
            self.publish()?;
        }
        Ok(outcome)
    }

    /// Re-read the record `id` and replace it with whatever `f` returns.
    ///
    /// `f` gets the backing file's path and runs under the write lock, so a
    /// concurrent delete either happens before (and `f` never runs) or waits
    /// until the file and record are both settled. An error from `f` leaves
    /// the record untouched.
    pub fn modify<F>(&self, id: &TrackId, f: F) -> LibraryResult<Track>
    where
        F: FnOnce(&Path, Track) -> LibraryResult<Track>,
    {
        let _guard = lock(&self.write_lock);
        let current = self
            .store
            .get(id)?
            .ok_or_else(|| LibraryError::NotFound(id.clone()))?;
        let path = self.resolve(&current);
        let updated = f(&path, current)?;
        self.store.update(&updated)?;
        debug!(id = %updated.id, "updated track record");
        self.publish()?;
        Ok(updated)
    }

    /// Remove the record and its backing file.
    pub fn delete(&self, id: &TrackId) -> LibraryResult<Track> {
        let _guard = lock(&self.write_lock);
        let removed = self
            .store
            .delete(id)?
            .ok_or_else(|| LibraryError::NotFound(id.clone()))?;

        let path = self.resolve(&removed);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("backing file {:?} was already gone", path);
            }
            Err(e) => warn!("failed to remove backing file {:?}: {e}", path),
        }
        info!(id = %removed.id, "deleted track");

        self.publish()?;
        Ok(removed)
    }

    fn publish(&self) -> LibraryResult<()> {
        let snapshot: CatalogSnapshot = self.store.list()?.into();
        for listener in lock(&self.listeners).iter() {
            listener(snapshot.clone());
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
