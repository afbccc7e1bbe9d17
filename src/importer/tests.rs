use super::*;
use crate::library::SqliteCatalogStore;
use crate::tags::{TrackEdit, mpeg_stream, write_id3};
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

struct Fixture {
    src: TempDir,
    data: TempDir,
    library: Library,
    settings: LibrarySettings,
}

fn fixture() -> Fixture {
    let src = tempdir().unwrap();
    let data = tempdir().unwrap();
    let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
    let library = Library::new(store, data.path().join("songs"));
    Fixture {
        src,
        data,
        library,
        settings: LibrarySettings::default(),
    }
}

impl Fixture {
    fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let p = self.src.path().join(name);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&p, bytes).unwrap();
        p
    }

    fn run(&self, paths: &[PathBuf]) -> ImportReport {
        import(&self.library, &self.settings, paths, &CancelToken::new())
    }
}

#[test]
fn is_audio_file_matches_configured_extensions_case_insensitive() {
    let exts = LibrarySettings::default().normalized_extensions();
    assert!(is_audio_file(Path::new("/tmp/a.mp3"), &exts));
    assert!(is_audio_file(Path::new("/tmp/a.MP3"), &exts));
    assert!(is_audio_file(Path::new("/tmp/a.flac"), &exts));
    assert!(!is_audio_file(Path::new("/tmp/a.txt"), &exts));
    assert!(!is_audio_file(Path::new("/tmp/a"), &exts));
}

#[test]
fn import_copies_into_storage_and_falls_back_to_file_stem() {
    let fx = fixture();
    let src = fx.write("My Song.mp3", b"not a real mp3");

    let report = fx.run(&[src.clone()]);
    assert_eq!(report.imported.len(), 1);
    assert!(report.failures.is_empty());

    let track = &report.imported[0];
    assert_eq!(track.title, "My Song");
    assert_eq!(track.file_ref, "My Song.mp3");
    assert_eq!(track.file_extension.as_deref(), Some("MP3"));
    assert_eq!(track.size, Some(14));
    assert!(track.created_at.is_some());

    let stored = fx.library.resolve(track);
    assert_eq!(fs::read(&stored).unwrap(), b"not a real mp3");
    // Source is left alone.
    assert!(src.exists());
}

#[test]
fn import_extracts_tag_fields_and_duration_from_real_mpeg() {
    let fx = fixture();
    let src = fx.write("tagged.mp3", &mpeg_stream());
    let edit = TrackEdit {
        title: "Café Noir".into(),
        artist: Some("Sigur Rós".into()),
        album: Some("Ágætis byrjun".into()),
        cover_art: Some(JPEG.to_vec()),
    };
    write_id3(&src, &edit).unwrap();

    let report = fx.run(&[src]);
    assert!(report.failures.is_empty(), "{:?}", report.failures);
    let track = &report.imported[0];
    assert_eq!(track.title, "Café Noir");
    assert_eq!(track.artist.as_deref(), Some("Sigur Rós"));
    assert_eq!(track.album.as_deref(), Some("Ágætis byrjun"));
    assert_eq!(track.cover_art.as_deref(), Some(JPEG));
    let secs = track.duration.unwrap().as_secs_f64();
    assert!((4.0..6.5).contains(&secs), "{secs}");

    let stored = fx.library.get(&track.id).unwrap().unwrap();
    assert_eq!(stored.cover_art, track.cover_art);
    assert_eq!(
        stored.duration.map(|d| d.as_millis()),
        track.duration.map(|d| d.as_millis())
    );
}

#[test]
fn importing_same_file_twice_yields_one_record() {
    let fx = fixture();
    let src = fx.write("a.mp3", b"x");

    let first = fx.run(&[src.clone()]);
    let second = fx.run(&[src.clone(), src]);

    assert_eq!(first.imported.len(), 1);
    assert!(second.imported.is_empty());
    assert_eq!(second.duplicates.len(), 2);
    assert_eq!(fx.library.snapshot().unwrap().len(), 1);
}

#[test]
fn failures_do_not_abort_the_batch() {
    let fx = fixture();
    let good = fx.write("good.ogg", b"x");
    let text = fx.write("notes.txt", b"x");
    let missing = fx.src.path().join("missing.mp3");
    let also_good = fx.write("also.wav", b"x");

    let report = fx.run(&[good, text, missing, also_good]);

    assert_eq!(report.imported.len(), 2);
    assert_eq!(report.failures.len(), 2);
    assert!(matches!(
        report.failures[0].error,
        LibraryError::FormatUnsupported { .. }
    ));
    assert!(matches!(
        report.failures[1].error,
        LibraryError::ResourceUnavailable { .. }
    ));
    assert_eq!(report.summary(), "imported 2, 2 failed");
}

#[test]
fn directories_expand_to_audio_files_skipping_hidden() {
    let fx = fixture();
    fx.write("album/01.mp3", b"x");
    fx.write("album/cover.jpg", b"x");
    fx.write("album/.hidden.mp3", b"x");
    fx.write("album/disc2/02.flac", b"x");

    let report = fx.run(&[fx.src.path().join("album")]);
    let mut names: Vec<&str> = report.imported.iter().map(|t| t.file_ref.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["01.mp3", "02.flac"]);
    assert!(report.failures.is_empty());
}

#[test]
fn cancelled_batch_reports_remaining_paths_as_skipped() {
    let fx = fixture();
    let a = fx.write("a.mp3", b"x");
    let b = fx.write("b.mp3", b"x");

    let cancel = CancelToken::new();
    cancel.cancel();
    let report = import(&fx.library, &fx.settings, &[a, b], &cancel);

    assert!(report.imported.is_empty());
    assert_eq!(report.skipped.len(), 2);
    assert!(fx.library.snapshot().unwrap().is_empty());
}

#[test]
fn existing_storage_file_is_reused_without_temp_leftovers() {
    let fx = fixture();
    let storage = fx.data.path().join("songs");
    fs::create_dir_all(&storage).unwrap();
    fs::write(storage.join("kept.mp3"), b"already here").unwrap();
    let src = fx.write("kept.mp3", b"new bytes");

    let report = fx.run(&[src]);
    assert_eq!(report.imported.len(), 1);
    assert_eq!(fs::read(storage.join("kept.mp3")).unwrap(), b"already here");

    let leftovers: Vec<_> = fs::read_dir(&storage)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
        .collect();
    assert!(leftovers.is_empty());
}
