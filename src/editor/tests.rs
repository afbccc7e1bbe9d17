use super::*;
use crate::library::SqliteCatalogStore;
use id3::TagLike;
use crate::tags::{mpeg_stream, read_tags};
use std::sync::Arc;
use std::thread;
use tempfile::{TempDir, tempdir};

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

fn setup(file_ref: &str, ext: &str) -> (TempDir, Library, Track) {
    let dir = tempdir().unwrap();
    let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
    let library = Library::new(store, dir.path());
    fs::write(dir.path().join(file_ref), b"audio payload").unwrap();

    let mut track = Track::new("Old Title", file_ref);
    track.artist = Some("Old Artist".into());
    track.file_extension = Some(ext.into());
    library.insert(track.clone()).unwrap();
    (dir, library, track)
}

fn new_fields() -> TrackEdit {
    TrackEdit {
        title: "New Title".into(),
        artist: Some("New Artist".into()),
        album: Some("New Album".into()),
        cover_art: Some(JPEG.to_vec()),
    }
}

#[test]
fn edit_updates_record_and_rewrites_tag_block() {
    let (dir, library, track) = setup("song.mp3", "MP3");

    let outcome = edit(
        &library,
        &EditorSettings::default(),
        &track.id,
        new_fields(),
        &CancelToken::new(),
    )
    .unwrap();
    assert!(outcome.file_rewritten);

    let stored = library.get(&track.id).unwrap().unwrap();
    assert_eq!(stored.id, track.id);
    assert_eq!(stored.title, "New Title");
    assert_eq!(stored.artist.as_deref(), Some("New Artist"));
    assert_eq!(stored.album.as_deref(), Some("New Album"));
    assert_eq!(stored.cover_art.as_deref(), Some(JPEG));

    let tag = id3::Tag::read_from_path(dir.path().join("song.mp3")).unwrap();
    assert_eq!(tag.title(), Some("New Title"));
    assert_eq!(tag.artist(), Some("New Artist"));
    assert_eq!(tag.album(), Some("New Album"));
    assert_eq!(tag.pictures().next().map(|p| p.mime_type.as_str()), Some("image/jpeg"));

    // The audio payload survives after the tag block.
    let bytes = fs::read(dir.path().join("song.mp3")).unwrap();
    assert!(bytes.ends_with(b"audio payload"));
}

#[test]
fn edit_leaves_no_temporary_siblings() {
    let (dir, library, track) = setup("song.mp3", "MP3");
    edit(
        &library,
        &EditorSettings::default(),
        &track.id,
        new_fields(),
        &CancelToken::new(),
    )
    .unwrap();

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["song.mp3".to_string()]);
}

#[test]
fn untaggable_format_only_updates_record() {
    let (dir, library, track) = setup("song.flac", "FLAC");

    let outcome = edit(
        &library,
        &EditorSettings::default(),
        &track.id,
        new_fields(),
        &CancelToken::new(),
    )
    .unwrap();

    assert!(!outcome.file_rewritten);
    assert_eq!(outcome.skipped_format.as_deref(), Some("FLAC"));
    assert_eq!(library.get(&track.id).unwrap().unwrap().title, "New Title");
    assert_eq!(fs::read(dir.path().join("song.flac")).unwrap(), b"audio payload");
}

#[test]
fn missing_backing_file_leaves_record_untouched() {
    let (dir, library, track) = setup("song.mp3", "MP3");
    fs::remove_file(dir.path().join("song.mp3")).unwrap();

    let err = edit(
        &library,
        &EditorSettings::default(),
        &track.id,
        new_fields(),
        &CancelToken::new(),
    )
    .unwrap_err();

    assert!(matches!(err, LibraryError::ResourceUnavailable { .. }));
    assert_eq!(library.get(&track.id).unwrap().unwrap().title, "Old Title");
}

#[test]
fn edit_is_idempotent_on_retry() {
    let (dir, library, track) = setup("song.mp3", "MP3");
    let settings = EditorSettings::default();

    let first = edit(&library, &settings, &track.id, new_fields(), &CancelToken::new()).unwrap();
    let second = edit(&library, &settings, &track.id, new_fields(), &CancelToken::new()).unwrap();
    assert_eq!(first.track.id, second.track.id);
    assert_eq!(first.track.title, second.track.title);
    assert_eq!(first.track.cover_art, second.track.cover_art);

    let tag = id3::Tag::read_from_path(dir.path().join("song.mp3")).unwrap();
    assert_eq!(tag.title(), Some("New Title"));
    assert_eq!(tag.pictures().count(), 1);
    let bytes = fs::read(dir.path().join("song.mp3")).unwrap();
    assert!(bytes.ends_with(b"audio payload"));
    assert_eq!(library.snapshot().unwrap().len(), 1);
}

#[test]
fn cancelled_edit_changes_nothing() {
    let (dir, library, track) = setup("song.mp3", "MP3");
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = edit(&library, &EditorSettings::default(), &track.id, new_fields(), &cancel)
        .unwrap_err();

    assert!(matches!(err, LibraryError::Cancelled));
    assert_eq!(fs::read(dir.path().join("song.mp3")).unwrap(), b"audio payload");
}

#[test]
fn editing_unknown_id_is_not_found() {
    let (_dir, library, _track) = setup("song.mp3", "MP3");
    let err = edit(
        &library,
        &EditorSettings::default(),
        &TrackId::from("nope"),
        new_fields(),
        &CancelToken::new(),
    )
    .unwrap_err();
    assert!(matches!(err, LibraryError::NotFound(_)));
}

#[test]
fn blank_title_keeps_the_current_one() {
    let (dir, library, track) = setup("song.mp3", "MP3");
    let fields = TrackEdit {
        title: "   ".into(),
        ..new_fields()
    };

    let outcome = edit(&library, &EditorSettings::default(), &track.id, fields, &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.track.title, "Old Title");
    assert_eq!(library.get(&track.id).unwrap().unwrap().title, "Old Title");
    let tag = id3::Tag::read_from_path(dir.path().join("song.mp3")).unwrap();
    assert_eq!(tag.title(), Some("Old Title"));
    assert_eq!(tag.artist(), Some("New Artist"));
}

#[test]
fn edited_mpeg_reads_back_exactly() {
    let (dir, library, track) = setup("song.mp3", "MP3");
    let path = dir.path().join("song.mp3");
    fs::write(&path, mpeg_stream()).unwrap();
    let fields = TrackEdit {
        title: "Ñandú".into(),
        artist: Some("Björk".into()),
        album: Some("Homogenic ★".into()),
        cover_art: Some(JPEG.to_vec()),
    };

    edit(&library, &EditorSettings::default(), &track.id, fields, &CancelToken::new()).unwrap();

    let info = read_tags(&path).unwrap();
    assert_eq!(info.title.as_deref(), Some("Ñandú"));
    assert_eq!(info.artist.as_deref(), Some("Björk"));
    assert_eq!(info.album.as_deref(), Some("Homogenic ★"));
    assert_eq!(info.cover_art.as_deref(), Some(JPEG));
    assert!(info.duration.is_some());

    let stored = library.get(&track.id).unwrap().unwrap();
    assert_eq!(stored.size, Some(fs::metadata(&path).unwrap().len()));
}

#[test]
fn edit_racing_delete_never_leaves_an_orphaned_file() {
    for round in 0..50 {
        let dir = tempdir().unwrap();
        let store = Arc::new(SqliteCatalogStore::in_memory().unwrap());
        let library = Arc::new(Library::new(store, dir.path()));
        let path = dir.path().join("song.mp3");
        fs::write(&path, mpeg_stream()).unwrap();
        let track = Track::new("Old Title", "song.mp3");
        library.insert(track.clone()).unwrap();

        let editor = {
            let library = Arc::clone(&library);
            let id = track.id.clone();
            thread::spawn(move || {
                edit(&library, &EditorSettings::default(), &id, new_fields(), &CancelToken::new())
            })
        };
        let deleted = library.delete(&track.id);
        let edited = editor.join().unwrap();

        assert!(deleted.is_ok(), "round {round}: {deleted:?}");
        assert!(
            matches!(edited, Ok(_) | Err(LibraryError::NotFound(_))),
            "round {round}: {edited:?}"
        );
        assert!(library.get(&track.id).unwrap().is_none());
        let left: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(left.is_empty(), "round {round}: {left:?}");
    }
}
