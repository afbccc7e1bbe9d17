//! SQLite-backed storage for track records.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::DateTime;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{info, warn};

use crate::error::{LibraryError, LibraryResult};

use super::model::{Track, TrackId};

const SCHEMA_VERSION: i64 = 1;

const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tracks (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    artist TEXT,
    album TEXT,
    cover_art BLOB,
    duration_ms INTEGER,
    file_ref TEXT NOT NULL UNIQUE,
    file_extension TEXT,
    size INTEGER,
    created_at INTEGER
);
";

const COLUMNS: &str =
    "id, title, artist, album, cover_art, duration_ms, file_ref, file_extension, size, created_at";

/// Result of inserting a record.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Track),
    /// A record with the same `file_ref` already exists; it is returned unchanged.
    Duplicate(Track),
}

/// Persistent catalog of track records.
///
/// Implementations own record lifecycle only; backing files are handled by
/// [`super::Library`].
pub trait CatalogStore: Send + Sync {
    /// Insert `track` unless its `file_ref` is already catalogued.
    fn insert(&self, track: Track) -> LibraryResult<InsertOutcome>;

    fn get(&self, id: &TrackId) -> LibraryResult<Option<Track>>;

    fn find_by_file_ref(&self, file_ref: &str) -> LibraryResult<Option<Track>>;

    /// All records in insertion order.
    fn list(&self) -> LibraryResult<Vec<Track>>;

    /// Replace the stored fields of `track.id`. Fails with `NotFound` if absent.
    fn update(&self, track: &Track) -> LibraryResult<()>;

    /// Remove a record, returning it if it existed.
    fn delete(&self, id: &TrackId) -> LibraryResult<Option<Track>>;
}

pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCatalogStore {
    /// Open an existing catalog or create one with the current schema.
    pub fn new<P: AsRef<Path>>(db_path: P) -> LibraryResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
        }
        let existed = db_path.exists();
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_millis(250))?;
        Self::prepare(&conn)?;
        if !existed {
            info!("Created new catalog database at {:?}", db_path);
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store for testing.
    #[cfg(test)]
    pub fn in_memory() -> LibraryResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::prepare(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn prepare(conn: &Connection) -> LibraryResult<()> {
        let version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            warn!(
                "Catalog schema version {} is newer than supported version {}",
                version, SCHEMA_VERSION
            );
        }
        conn.execute_batch(CREATE_SCHEMA)?;
        conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a write, retrying once when SQLite reports the database busy or locked.
    fn write<T>(&self, op: impl Fn(&Connection) -> rusqlite::Result<T>) -> LibraryResult<T> {
        let conn = self.lock();
        match op(&conn) {
            Err(e) if is_contention(&e) => {
                warn!("Catalog write contended, retrying once: {e}");
                thread::sleep(Duration::from_millis(50));
                op(&conn).map_err(LibraryError::Persistence)
            }
            other => other.map_err(LibraryError::Persistence),
        }
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        Ok(Track {
            id: TrackId::from(row.get::<_, String>("id")?),
            title: row.get("title")?,
            artist: row.get("artist")?,
            album: row.get("album")?,
            cover_art: row.get("cover_art")?,
            duration: row
                .get::<_, Option<i64>>("duration_ms")?
                .map(|ms| Duration::from_millis(ms.max(0) as u64)),
            file_ref: row.get("file_ref")?,
            file_extension: row.get("file_extension")?,
            size: row.get::<_, Option<i64>>("size")?.map(|s| s.max(0) as u64),
            created_at: row
                .get::<_, Option<i64>>("created_at")?
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    fn query_one(&self, filter: &str, value: &str) -> LibraryResult<Option<Track>> {
        let conn = self.lock();
        let sql = format!("SELECT {COLUMNS} FROM tracks WHERE {filter} = ?1");
        let track = conn
            .query_row(&sql, params![value], Self::row_to_track)
            .optional()?;
        Ok(track)
    }
}

fn is_contention(e: &rusqlite::Error) -> bool {
    matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked)
    )
}

fn duration_ms(track: &Track) -> Option<i64> {
    track.duration.map(|d| d.as_millis() as i64)
}

impl CatalogStore for SqliteCatalogStore {
    fn insert(&self, track: Track) -> LibraryResult<InsertOutcome> {
        let changed = self.write(|conn| {
            conn.execute(
                &format!(
                    "INSERT OR IGNORE INTO tracks ({COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    track.id.as_str(),
                    track.title,
                    track.artist,
                    track.album,
                    track.cover_art,
                    duration_ms(&track),
                    track.file_ref,
                    track.file_extension,
                    track.size.map(|s| s as i64),
                    track.created_at.map(|d| d.timestamp()),
                ],
            )
        })?;

        if changed == 1 {
            return Ok(InsertOutcome::Inserted(track));
        }
        match self.find_by_file_ref(&track.file_ref)? {
            Some(existing) => Ok(InsertOutcome::Duplicate(existing)),
            // The id collided rather than the file ref; extremely unlikely with v4 ids.
            None => Err(LibraryError::Persistence(rusqlite::Error::StatementChangedRows(0))),
        }
    }

    fn get(&self, id: &TrackId) -> LibraryResult<Option<Track>> {
        self.query_one("id", id.as_str())
    }

    fn find_by_file_ref(&self, file_ref: &str) -> LibraryResult<Option<Track>> {
        self.query_one("file_ref", file_ref)
    }

    fn list(&self) -> LibraryResult<Vec<Track>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("SELECT {COLUMNS} FROM tracks ORDER BY seq"))?;
        let tracks = stmt
            .query_map([], Self::row_to_track)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tracks)
    }

    fn update(&self, track: &Track) -> LibraryResult<()> {
        let changed = self.write(|conn| {
            conn.execute(
                "UPDATE tracks SET title = ?2, artist = ?3, album = ?4, cover_art = ?5, \
                 duration_ms = ?6, file_ref = ?7, file_extension = ?8, size = ?9, \
                 created_at = ?10 WHERE id = ?1",
                params![
                    track.id.as_str(),
                    track.title,
                    track.artist,
                    track.album,
                    track.cover_art,
                    duration_ms(track),
                    track.file_ref,
                    track.file_extension,
                    track.size.map(|s| s as i64),
                    track.created_at.map(|d| d.timestamp()),
                ],
            )
        })?;
        if changed == 0 {
            return Err(LibraryError::NotFound(track.id.clone()));
        }
        Ok(())
    }

    fn delete(&self, id: &TrackId) -> LibraryResult<Option<Track>> {
        let Some(existing) = self.get(id)? else {
            return Ok(None);
        };
        self.write(|conn| conn.execute("DELETE FROM tracks WHERE id = ?1", params![id.as_str()]))?;
        Ok(Some(existing))
    }
}
