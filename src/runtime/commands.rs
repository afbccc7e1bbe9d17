//! One-shot subcommands that work on the catalog without starting the TUI.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use tracing::warn;

use crate::config::Settings;
use crate::jobs;
use crate::library::{TrackId, format_mmss};
use crate::tags::TrackEdit;

use super::open_library;

/// Field changes requested on the command line; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub cover: Option<PathBuf>,
    pub clear_cover: bool,
}

pub fn import(settings: Settings, paths: Vec<PathBuf>) -> anyhow::Result<()> {
    let settings = Arc::new(settings);
    let library = open_library(&settings)?;

    let report = jobs::spawn_import(library, settings, paths)
        .join()
        .context("import worker panicked")?;

    for track in &report.imported {
        println!("imported  {}  {}", track.id, track.display());
    }
    for track in &report.duplicates {
        println!("existing  {}  {}", track.id, track.display());
    }
    for failure in &report.failures {
        println!("failed    {}: {}", failure.path.display(), failure.error);
    }
    println!("{}", report.summary());

    if !report.failures.is_empty() && report.imported.is_empty() && report.duplicates.is_empty() {
        bail!("nothing was imported");
    }
    Ok(())
}

pub fn list(settings: Settings) -> anyhow::Result<()> {
    let library = open_library(&settings)?;
    let tracks = library.snapshot()?;
    if tracks.is_empty() {
        println!("library is empty");
        return Ok(());
    }
    for track in tracks.iter() {
        let duration = track.duration.map(format_mmss).unwrap_or_else(|| "--:--".into());
        let album = track.album.as_deref().unwrap_or("-");
        println!("{}  {duration}  {}  [{album}]", track.id, track.display());
    }
    Ok(())
}

pub fn edit(settings: Settings, id: String, args: EditArgs) -> anyhow::Result<()> {
    let settings = Arc::new(settings);
    let library = open_library(&settings)?;
    let id = TrackId::from(id);
    let Some(current) = library.get(&id)? else {
        bail!("no track with id {id}");
    };

    let cover_art = match (&args.cover, args.clear_cover) {
        (Some(_), true) => bail!("--cover and --clear-cover are mutually exclusive"),
        (Some(path), false) => Some(
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))?,
        ),
        (None, true) => None,
        (None, false) => current.cover_art.clone(),
    };
    let edit = TrackEdit {
        title: args.title.unwrap_or(current.title),
        artist: args.artist.or(current.artist),
        album: args.album.or(current.album),
        cover_art,
    };

    let outcome = jobs::spawn_edit(library, settings, id, edit)
        .join()
        .context("edit worker panicked")??;

    if let Some(ext) = &outcome.skipped_format {
        warn!("{ext} files carry no editable tags; only the catalog was updated");
        println!("updated record only ({ext} tags are not editable)");
    } else if outcome.file_rewritten {
        println!("updated record and file tags");
    }
    println!("{}  {}", outcome.track.id, outcome.track.display());
    Ok(())
}

pub fn delete(settings: Settings, id: String) -> anyhow::Result<()> {
    let library = open_library(&settings)?;
    let track = library.delete(&TrackId::from(id))?;
    println!("deleted {}  {}", track.id, track.display());
    Ok(())
}

/// Print the effective settings as TOML.
pub fn show_config(settings: &Settings) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(settings).context("failed to serialize settings")?;
    print!("{text}");
    Ok(())
}
