use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::Context;
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, warn};

use crate::app::App;
use crate::audio::RodioOutput;
use crate::config::Settings;
use crate::interruptions;
use crate::library::{Library, SqliteCatalogStore};
use crate::mpris::{ControlCmd, spawn_mpris};
use crate::player::PlayerHandle;

pub mod commands;
mod event_loop;
pub mod logging;
mod settings;

pub use settings::load_settings;

/// Open the catalog under the configured data directory.
pub fn open_library(settings: &Settings) -> anyhow::Result<Arc<Library>> {
    let db = settings.catalog_path();
    let store = SqliteCatalogStore::new(&db)
        .with_context(|| format!("failed to open catalog at {}", db.display()))?;
    Ok(Arc::new(Library::new(Arc::new(store), settings.storage_dir())))
}

/// Run the terminal player until the user quits.
pub fn run_tui(settings: Settings) -> anyhow::Result<()> {
    let settings = Arc::new(settings);
    let library = open_library(&settings)?;
    let tracks = library.snapshot().context("failed to read catalog")?;
    info!("loaded {} tracks from {}", tracks.len(), settings.data_dir().display());

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = spawn_mpris(control_tx.clone(), Some(settings.art_dir()));

    let (error_tx, error_rx) = mpsc::channel();
    let player = PlayerHandle::spawn(
        RodioOutput::open_default,
        mpris,
        settings.playback.clone(),
        library.storage_dir().to_path_buf(),
        tracks.clone(),
        error_tx,
    )
    .context("no audio output device")?;

    let (catalog_tx, catalog_rx) = mpsc::channel();
    library.on_change(event_loop::forward_catalog(player.sender(), catalog_tx));
    interruptions::spawn_sleep_watch(player.sender());

    let mut app = App::new(tracks);
    let mut state = event_loop::EventLoopState::new(
        player.subscribe(),
        catalog_rx,
        error_rx,
        control_tx,
        control_rx,
    );

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let services = event_loop::Services {
        settings: &settings,
        library: &library,
        player: &player,
    };
    let run_result = event_loop::run(&mut terminal, &services, &mut app, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    state.finish_jobs();
    player.quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
    if let Err(ref e) = run_result {
        warn!("event loop ended with error: {e:#}");
    }
    run_result
}
