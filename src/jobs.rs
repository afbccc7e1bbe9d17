//! Background units of work (imports, metadata edits) that never block the UI.
//!
//! Each job runs on its own thread and observes a [`CancelToken`] between
//! steps. Callers either `join` or poll `is_finished` from their own loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::config::Settings;
use crate::editor::{self, EditOutcome};
use crate::error::LibraryResult;
use crate::importer::{self, ImportReport};
use crate::library::{Library, TrackId};
use crate::tags::TrackEdit;

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Job<T> {
    cancel: CancelToken,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Job<T> {
    fn spawn(f: impl FnOnce(CancelToken) -> T + Send + 'static) -> Self {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let handle = thread::spawn(move || f(token));
        Self { cancel, handle }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the job. `None` if the worker panicked.
    pub fn join(self) -> Option<T> {
        self.handle.join().ok()
    }
}

pub fn spawn_import(
    library: Arc<Library>,
    settings: Arc<Settings>,
    paths: Vec<PathBuf>,
) -> Job<ImportReport> {
    Job::spawn(move |cancel| importer::import(&library, &settings.library, &paths, &cancel))
}

pub fn spawn_edit(
    library: Arc<Library>,
    settings: Arc<Settings>,
    id: TrackId,
    edit: TrackEdit,
) -> Job<LibraryResult<EditOutcome>> {
    Job::spawn(move |cancel| editor::edit(&library, &settings.editor, &id, edit, &cancel))
}
