use std::path::Path;
use std::time::Duration;

use lofty::prelude::*;

/// Tag fields and stream properties extracted from an audio file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagInfo {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover_art: Option<Vec<u8>>,
    pub duration: Option<Duration>,
}

fn non_empty(v: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Read the primary (or first) tag plus the stream duration.
pub fn read_tags(path: &Path) -> Result<TagInfo, lofty::error::LoftyError> {
    let tagged = lofty::read_from_path(path)?;

    let mut info = TagInfo {
        duration: Some(tagged.properties().duration()).filter(|d| !d.is_zero()),
        ..TagInfo::default()
    };

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        info.title = non_empty(tag.title());
        info.artist = non_empty(tag.artist());
        info.album = non_empty(tag.album());
        info.cover_art = tag.pictures().first().map(|p| p.data().to_vec());
    }

    Ok(info)
}
