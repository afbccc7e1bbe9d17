//! Write edited fields into an ID3v2 tag block.

use std::path::Path;

use id3::frame::{Picture, PictureType};
use id3::{Tag, TagLike, Version};

use super::art::sniff_mime;

/// The user-editable fields of a track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackEdit {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover_art: Option<Vec<u8>>,
}

/// Helper: set/remove a plain text frame (T***)
fn set_text_opt(tag: &mut Tag, id: &str, v: Option<&str>) {
    match v.map(str::trim) {
        Some(s) if !s.is_empty() => tag.set_text(id, s.to_string()),
        _ => {
            let _ = tag.remove(id);
        }
    }
}

/// Rewrite the tag of the file at `path` in place, keeping frames we do not edit.
///
/// Empty text fields remove their frame; `cover_art: None` removes all pictures.
pub fn write_id3(path: &Path, edit: &TrackEdit) -> Result<(), id3::Error> {
    // Load existing tag if possible; otherwise start fresh.
    let mut tag = Tag::read_from_path(path).unwrap_or_else(|_| Tag::new());

    set_text_opt(&mut tag, "TIT2", Some(&edit.title));
    set_text_opt(&mut tag, "TPE1", edit.artist.as_deref());
    set_text_opt(&mut tag, "TALB", edit.album.as_deref());

    tag.remove_all_pictures();
    if let Some(data) = edit.cover_art.as_ref().filter(|d| !d.is_empty()) {
        tag.add_frame(Picture {
            mime_type: sniff_mime(data).to_string(),
            picture_type: PictureType::CoverFront,
            description: String::new(),
            data: data.clone(),
        });
    }

    tag.write_to_path(path, Version::Id3v24)
}
