//! Application model types: `App`, `Notice` and the input `Mode`.
//!
//! The `App` struct holds the latest catalog snapshot, the selection, the
//! last transport state seen from the player, and transient UI overlays.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::library::{CatalogSnapshot, Track, TrackId, position_of};
use crate::player::TransportState;
use crate::tags::TrackEdit;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// A one-line message shown until the user dismisses it or a newer one
/// replaces it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Typing a file or folder path to import.
    ImportPrompt { input: String },
    /// Waiting for `y` to delete the selected track.
    ConfirmDelete(TrackId),
    /// Editing the metadata of one track.
    Edit(EditForm),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EditField {
    Title,
    Artist,
    Album,
    Cover,
}

impl EditField {
    pub const ALL: [EditField; 4] = [Self::Title, Self::Artist, Self::Album, Self::Cover];

    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "Title",
            Self::Artist => "Artist",
            Self::Album => "Album",
            Self::Cover => "Cover",
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Title => Self::Artist,
            Self::Artist => Self::Album,
            Self::Album => Self::Cover,
            Self::Cover => Self::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            Self::Title => Self::Cover,
            Self::Artist => Self::Title,
            Self::Album => Self::Artist,
            Self::Cover => Self::Album,
        }
    }
}

/// Field buffers of the edit form, prefilled from the track.
///
/// `cover` holds a path to an image file. Left empty, the current artwork
/// is kept unless `clear_cover` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditForm {
    pub id: TrackId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover: String,
    pub clear_cover: bool,
    pub field: EditField,
}

impl EditForm {
    pub fn for_track(track: &Track) -> Self {
        Self {
            id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone().unwrap_or_default(),
            album: track.album.clone().unwrap_or_default(),
            cover: String::new(),
            clear_cover: false,
            field: EditField::Title,
        }
    }

    pub fn value(&self, field: EditField) -> &str {
        match field {
            EditField::Title => &self.title,
            EditField::Artist => &self.artist,
            EditField::Album => &self.album,
            EditField::Cover => &self.cover,
        }
    }

    fn active_mut(&mut self) -> &mut String {
        match self.field {
            EditField::Title => &mut self.title,
            EditField::Artist => &mut self.artist,
            EditField::Album => &mut self.album,
            EditField::Cover => &mut self.cover,
        }
    }

    /// The image file to embed, if one was entered.
    pub fn cover_path(&self) -> Option<PathBuf> {
        let path = unquote(&self.cover);
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Build the edit. `new_cover` holds the bytes read from `cover_path`;
    /// without it the current artwork is kept or, if requested, removed.
    pub fn into_edit(self, current: &Track, new_cover: Option<Vec<u8>>) -> TrackEdit {
        let cover_art = match new_cover {
            Some(data) => Some(data),
            None if self.clear_cover => None,
            None => current.cover_art.clone(),
        };
        TrackEdit {
            title: self.title,
            artist: Some(self.artist),
            album: Some(self.album),
            cover_art,
        }
    }
}

/// Terminals wrap dropped paths in quotes; strip them.
fn unquote(input: &str) -> &str {
    let trimmed = input.trim();
    trimmed
        .strip_prefix(['\'', '"'])
        .and_then(|s| s.strip_suffix(['\'', '"']))
        .unwrap_or(trimmed)
}

/// A seek gesture in progress: the position the user is dragging towards and
/// when they last nudged it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Scrub {
    pub target: Duration,
    pub last_input: Instant,
}

/// The main application model.
pub struct App {
    pub tracks: CatalogSnapshot,
    /// Selection is kept by id so it survives catalog reordering.
    selected: Option<TrackId>,
    pub transport: TransportState,
    pub notice: Option<Notice>,
    pub mode: Mode,
    pub details_window: bool,
    /// Label of the background job in flight, if any.
    pub busy: Option<String>,
    pub scrub: Option<Scrub>,
}

impl App {
    pub fn new(tracks: CatalogSnapshot) -> Self {
        let selected = tracks.first().map(|t| t.id.clone());
        Self {
            tracks,
            selected,
            transport: TransportState::default(),
            notice: None,
            mode: Mode::Normal,
            details_window: false,
            busy: None,
            scrub: None,
        }
    }

    pub fn has_tracks(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Replace the catalog. The selection stays on the same track if it still
    /// exists, otherwise on the track that took its position.
    pub fn set_tracks(&mut self, tracks: CatalogSnapshot) {
        let old_pos = self.selected_index();
        self.tracks = tracks;

        let prompt_target = match &self.mode {
            Mode::ConfirmDelete(id) => Some(id),
            Mode::Edit(form) => Some(&form.id),
            _ => None,
        };
        if prompt_target.is_some_and(|id| position_of(&self.tracks, id).is_none()) {
            self.mode = Mode::Normal;
        }

        let still_there = self
            .selected
            .as_ref()
            .is_some_and(|id| position_of(&self.tracks, id).is_some());
        if still_there {
            return;
        }

        self.selected = match old_pos {
            Some(p) if !self.tracks.is_empty() => {
                Some(self.tracks[p.min(self.tracks.len() - 1)].id.clone())
            }
            _ => self.tracks.first().map(|t| t.id.clone()),
        };
    }

    pub fn set_transport(&mut self, state: TransportState) {
        if !state.is_loaded() {
            self.scrub = None;
        }
        self.transport = state;
    }

    /// Position to show on the progress line: the scrub target while
    /// scrubbing, the reported elapsed time otherwise.
    pub fn display_elapsed(&self) -> Duration {
        self.scrub.map_or(self.transport.elapsed, |s| s.target)
    }

    /// Move the scrub target by `delta_secs`, clamped to the loaded track.
    /// Returns `true` when this press started a new gesture.
    pub fn scrub_by(&mut self, delta_secs: i64, now: Instant) -> bool {
        if !self.transport.is_loaded() {
            return false;
        }
        let started = self.scrub.is_none();
        let from = self.display_elapsed();
        let delta = Duration::from_secs(delta_secs.unsigned_abs());
        let target = if delta_secs >= 0 {
            from.saturating_add(delta).min(self.transport.total)
        } else {
            from.saturating_sub(delta)
        };
        self.scrub = Some(Scrub {
            target,
            last_input: now,
        });
        started
    }

    /// End the gesture once no key arrived for `idle`, returning where to seek.
    pub fn take_settled_scrub(&mut self, now: Instant, idle: Duration) -> Option<Duration> {
        let scrub = self.scrub?;
        if now.saturating_duration_since(scrub.last_input) < idle {
            return None;
        }
        self.scrub = None;
        Some(scrub.target)
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
            .as_ref()
            .and_then(|id| position_of(&self.tracks, id))
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.selected_index().map(|i| &self.tracks[i])
    }

    pub fn set_selected(&mut self, idx: usize) {
        if let Some(t) = self.tracks.get(idx) {
            self.selected = Some(t.id.clone());
        }
    }

    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        position_of(&self.tracks, id).map(|i| &self.tracks[i])
    }

    /// The track the transport has loaded, looked up by id.
    pub fn now_playing(&self) -> Option<&Track> {
        self.track(self.transport.track_id.as_ref()?)
    }

    /// Move selection to the next track, wrapping to the first.
    pub fn next(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        let next = match self.selected_index() {
            Some(i) => (i + 1) % self.tracks.len(),
            None => 0,
        };
        self.set_selected(next);
    }

    /// Move selection to the previous track, wrapping to the last.
    pub fn prev(&mut self) {
        if self.tracks.is_empty() {
            return;
        }
        let prev = match self.selected_index() {
            Some(0) | None => self.tracks.len() - 1,
            Some(i) => i - 1,
        };
        self.set_selected(prev);
    }

    pub fn toggle_details_window(&mut self) {
        self.details_window = !self.details_window;
    }

    pub fn show_info(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Info,
            message: message.into(),
        });
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            kind: NoticeKind::Error,
            message: message.into(),
        });
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn enter_import_prompt(&mut self) {
        self.mode = Mode::ImportPrompt {
            input: String::new(),
        };
    }

    pub fn push_input_char(&mut self, c: char) {
        match &mut self.mode {
            Mode::ImportPrompt { input } => input.push(c),
            Mode::Edit(form) => form.active_mut().push(c),
            _ => {}
        }
    }

    pub fn pop_input_char(&mut self) {
        match &mut self.mode {
            Mode::ImportPrompt { input } => {
                input.pop();
            }
            Mode::Edit(form) => {
                form.active_mut().pop();
            }
            _ => {}
        }
    }

    /// Leave the prompt and return the entered path, if any.
    pub fn take_import_input(&mut self) -> Option<PathBuf> {
        let Mode::ImportPrompt { input } = std::mem::take(&mut self.mode) else {
            return None;
        };
        let path = unquote(&input);
        (!path.is_empty()).then(|| PathBuf::from(path))
    }

    /// Open the edit form for the selected track.
    pub fn enter_edit_prompt(&mut self) {
        if let Some(track) = self.selected_track() {
            self.mode = Mode::Edit(EditForm::for_track(track));
        }
    }

    pub fn next_edit_field(&mut self) {
        if let Mode::Edit(form) = &mut self.mode {
            form.field = form.field.next();
        }
    }

    pub fn prev_edit_field(&mut self) {
        if let Mode::Edit(form) = &mut self.mode {
            form.field = form.field.prev();
        }
    }

    /// Flip between keeping and removing the artwork. Removing also drops
    /// any cover path typed so far.
    pub fn toggle_clear_cover(&mut self) {
        if let Mode::Edit(form) = &mut self.mode {
            form.clear_cover = !form.clear_cover;
            if form.clear_cover {
                form.cover.clear();
            }
        }
    }

    /// Leave the edit form, returning it for submission.
    pub fn take_edit_form(&mut self) -> Option<EditForm> {
        match std::mem::take(&mut self.mode) {
            Mode::Edit(form) => Some(form),
            other => {
                self.mode = other;
                None
            }
        }
    }

    /// Ask for confirmation before deleting the selected track.
    pub fn request_delete(&mut self) {
        if let Some(id) = self.selected.clone() {
            self.mode = Mode::ConfirmDelete(id);
        }
    }

    /// Leave the confirm prompt, returning the track to delete.
    pub fn take_delete_confirmation(&mut self) -> Option<TrackId> {
        match std::mem::take(&mut self.mode) {
            Mode::ConfirmDelete(id) => Some(id),
            other => {
                self.mode = other;
                None
            }
        }
    }

    pub fn cancel_mode(&mut self) {
        self.mode = Mode::Normal;
    }
}
