use std::fs;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::app::{App, Mode};
use crate::config::Settings;
use crate::editor::EditOutcome;
use crate::error::{LibraryResult, PlayerError};
use crate::importer::ImportReport;
use crate::jobs::{self, Job};
use crate::library::{CatalogSnapshot, Library};
use crate::mpris::ControlCmd;
use crate::player::{PlayerCmd, PlayerEvent, PlayerHandle, TransportState};
use crate::ui;

/// How long H/L must rest before the scrub target is committed as a seek.
const SCRUB_SETTLE: Duration = Duration::from_millis(400);

/// Channels and jobs the event loop drains every iteration.
pub struct EventLoopState {
    pub transport: Receiver<TransportState>,
    pub catalog: Receiver<CatalogSnapshot>,
    pub errors: Receiver<PlayerError>,
    pub control_tx: Sender<ControlCmd>,
    pub control_rx: Receiver<ControlCmd>,
    import: Option<Job<ImportReport>>,
    edit: Option<Job<LibraryResult<EditOutcome>>>,
}

impl EventLoopState {
    pub fn new(
        transport: Receiver<TransportState>,
        catalog: Receiver<CatalogSnapshot>,
        errors: Receiver<PlayerError>,
        control_tx: Sender<ControlCmd>,
        control_rx: Receiver<ControlCmd>,
    ) -> Self {
        Self {
            transport,
            catalog,
            errors,
            control_tx,
            control_rx,
            import: None,
            edit: None,
        }
    }

    fn job_running(&self) -> bool {
        self.import.is_some() || self.edit.is_some()
    }

    /// Cancel and wait for running background jobs.
    pub fn finish_jobs(&mut self) {
        if let Some(job) = self.import.take() {
            job.cancel();
            let _ = job.join();
        }
        if let Some(job) = self.edit.take() {
            job.cancel();
            let _ = job.join();
        }
    }
}

/// Everything the loop needs besides the terminal and the model.
pub struct Services<'a> {
    pub settings: &'a Arc<Settings>,
    pub library: &'a Arc<Library>,
    pub player: &'a PlayerHandle,
}

/// Main terminal event loop: handles input, UI drawing and sync with the
/// player thread. Returns `Ok(())` when shutdown is requested.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    services: &Services<'_>,
    app: &mut App,
    state: &mut EventLoopState,
) -> anyhow::Result<()> {
    loop {
        drain_updates(app, state);
        poll_import(app, state);
        poll_edit(app, state);
        if let Some(target) = app.take_settled_scrub(Instant::now(), SCRUB_SETTLE) {
            services.player.send(PlayerEvent::EndScrub(target));
        }

        terminal.draw(|f| ui::draw(f, app, &services.settings.controls))?;

        while let Ok(cmd) = state.control_rx.try_recv() {
            if handle_control_cmd(cmd, services, app) {
                return Ok(());
            }
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, services, app, state) {
                    return Ok(());
                }
            }
        }
    }
}

fn drain_updates(app: &mut App, state: &EventLoopState) {
    if let Some(latest) = state.catalog.try_iter().last() {
        app.set_tracks(latest);
    }
    if let Some(latest) = state.transport.try_iter().last() {
        app.set_transport(latest);
    }
    if let Some(err) = state.errors.try_iter().last() {
        app.show_error(err.to_string());
    }
}

fn poll_import(app: &mut App, state: &mut EventLoopState) {
    if !state.import.as_ref().is_some_and(|j| j.is_finished()) {
        return;
    }
    app.busy = None;
    let Some(report) = state.import.take().and_then(|j| j.join()) else {
        app.show_error("import failed unexpectedly");
        return;
    };

    let shown = report.failures.iter().find(|f| f.error.is_user_visible());
    match (shown, report.failures.is_empty()) {
        (Some(first), _) => app.show_error(format!("{} ({})", report.summary(), first.error)),
        (None, false) => app.show_error(report.summary()),
        (None, true) => app.show_info(report.summary()),
    }
}

fn start_import(services: &Services<'_>, app: &mut App, state: &mut EventLoopState) {
    let Some(path) = app.take_import_input() else {
        return;
    };
    if state.job_running() {
        app.show_info("wait for the running job to finish");
        return;
    }
    info!("importing {}", path.display());
    app.busy = Some(format!("Importing {}...", path.display()));
    state.import = Some(jobs::spawn_import(
        services.library.clone(),
        services.settings.clone(),
        vec![path],
    ));
}

fn poll_edit(app: &mut App, state: &mut EventLoopState) {
    if !state.edit.as_ref().is_some_and(|j| j.is_finished()) {
        return;
    }
    app.busy = None;
    match state.edit.take().and_then(|j| j.join()) {
        Some(Ok(outcome)) => match outcome.skipped_format {
            Some(ext) => app.show_info(format!("updated record only ({ext} tags are not editable)")),
            None => app.show_info(format!("saved {}", outcome.track.display())),
        },
        Some(Err(e)) => app.show_error(e.to_string()),
        None => app.show_error("edit failed unexpectedly"),
    }
}

/// Submit the edit form. The form stays open when the cover file cannot be
/// read.
fn start_edit(services: &Services<'_>, app: &mut App, state: &mut EventLoopState) {
    let Some(form) = app.take_edit_form() else {
        return;
    };
    if state.job_running() {
        app.show_info("wait for the running job to finish");
        return;
    }
    let Some(current) = app.track(&form.id).cloned() else {
        app.show_error("track no longer exists");
        return;
    };
    let new_cover = match form.cover_path() {
        Some(path) => match fs::read(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                app.show_error(format!("cannot read cover {}: {e}", path.display()));
                app.mode = Mode::Edit(form);
                return;
            }
        },
        None => None,
    };

    let id = form.id.clone();
    let edit = form.into_edit(&current, new_cover);
    info!(id = %id, "editing track metadata");
    app.busy = Some(format!("Saving {}...", current.display()));
    state.edit = Some(jobs::spawn_edit(
        services.library.clone(),
        services.settings.clone(),
        id,
        edit,
    ));
}

/// Play the selected track, unless it is already the loaded one.
fn play_selected(services: &Services<'_>, app: &App) {
    let Some(track) = app.selected_track() else {
        return;
    };
    if app.transport.track_id.as_ref() == Some(&track.id) && app.transport.playing {
        return;
    }
    services.player.send(PlayerEvent::Play(track.id.clone()));
}

fn handle_control_cmd(cmd: ControlCmd, services: &Services<'_>, app: &mut App) -> bool {
    let player = services.player;
    match cmd {
        ControlCmd::Quit => return true,
        ControlCmd::Play => {
            if app.transport.is_loaded() {
                player.send(PlayerEvent::Resume);
            } else {
                play_selected(services, app);
            }
        }
        ControlCmd::Pause => player.send(PlayerEvent::Pause),
        ControlCmd::PlayPause => {
            if app.transport.is_loaded() {
                player.send(PlayerEvent::TogglePlayPause);
            } else {
                play_selected(services, app);
            }
        }
        ControlCmd::Stop => player.send(PlayerEvent::Stop),
        ControlCmd::Next => player.send(PlayerEvent::SkipForward),
        ControlCmd::Prev => player.send(PlayerEvent::SkipBack),
        ControlCmd::Seek(offset) => {
            let delta = Duration::from_micros(offset.unsigned_abs());
            let target = if offset >= 0 {
                app.transport.elapsed.saturating_add(delta)
            } else {
                app.transport.elapsed.saturating_sub(delta)
            };
            player.send(PlayerEvent::Seek(target));
        }
        ControlCmd::SetPosition(pos) => {
            let pos = u64::try_from(pos).unwrap_or(0);
            player.send(PlayerEvent::Seek(Duration::from_micros(pos)));
        }
        ControlCmd::SetRepeat(on) => player.send(PlayerEvent::SetRepeat(on)),
        ControlCmd::SetShuffle(on) => player.send(PlayerEvent::SetShuffle(on)),
    }
    false
}

fn handle_key_event(
    key: KeyEvent,
    services: &Services<'_>,
    app: &mut App,
    state: &mut EventLoopState,
) -> bool {
    match app.mode {
        Mode::ImportPrompt { .. } => {
            match key.code {
                KeyCode::Esc => app.cancel_mode(),
                KeyCode::Backspace => app.pop_input_char(),
                KeyCode::Enter => start_import(services, app, state),
                KeyCode::Char(c) if !c.is_control() => app.push_input_char(c),
                _ => {}
            }
            return false;
        }
        Mode::Edit(_) => {
            match key.code {
                KeyCode::Esc => app.cancel_mode(),
                KeyCode::Tab | KeyCode::Down => app.next_edit_field(),
                KeyCode::BackTab | KeyCode::Up => app.prev_edit_field(),
                KeyCode::Backspace => app.pop_input_char(),
                KeyCode::Delete => app.toggle_clear_cover(),
                KeyCode::Enter => start_edit(services, app, state),
                KeyCode::Char(c) if !c.is_control() => app.push_input_char(c),
                _ => {}
            }
            return false;
        }
        Mode::ConfirmDelete(_) => {
            if key.code == KeyCode::Char('y') {
                if let Some(id) = app.take_delete_confirmation() {
                    // The player learns about the deletion through the catalog listener.
                    match services.library.delete(&id) {
                        Ok(track) => app.show_info(format!("deleted {}", track.display())),
                        Err(e) => app.show_error(e.to_string()),
                    }
                }
            } else {
                app.cancel_mode();
            }
            return false;
        }
        Mode::Normal => {}
    }

    let player = services.player;
    let scrub = i64::try_from(services.settings.controls.scrub_seconds).unwrap_or(i64::MAX);
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => app.next(),
        KeyCode::Char('k') | KeyCode::Up => app.prev(),
        KeyCode::Enter => play_selected(services, app),
        KeyCode::Char('p') | KeyCode::Char(' ') => {
            let _ = state.control_tx.send(ControlCmd::PlayPause);
        }
        KeyCode::Char('l') => {
            let _ = state.control_tx.send(ControlCmd::Next);
        }
        KeyCode::Char('h') => {
            let _ = state.control_tx.send(ControlCmd::Prev);
        }
        KeyCode::Char('L') => scrub_by(player, app, scrub),
        KeyCode::Char('H') => scrub_by(player, app, -scrub),
        KeyCode::Char('x') => player.send(PlayerEvent::Stop),
        KeyCode::Char('r') => player.send(PlayerEvent::ToggleRepeat),
        KeyCode::Char('s') => player.send(PlayerEvent::ToggleShuffle),
        KeyCode::Char('i') => app.toggle_details_window(),
        KeyCode::Char('a') => app.enter_import_prompt(),
        KeyCode::Char('e') => app.enter_edit_prompt(),
        KeyCode::Char('d') => app.request_delete(),
        KeyCode::Esc => {
            if app.details_window {
                app.toggle_details_window();
            } else {
                app.dismiss_notice();
            }
        }
        _ => {}
    }
    false
}

fn scrub_by(player: &PlayerHandle, app: &mut App, delta_secs: i64) {
    if app.scrub_by(delta_secs, Instant::now()) {
        player.send(PlayerEvent::BeginScrub);
    }
}

/// Catalog listener that forwards every snapshot to the player and the UI.
pub fn forward_catalog(
    player: Sender<PlayerCmd>,
    ui: Sender<CatalogSnapshot>,
) -> impl Fn(CatalogSnapshot) + Send + Sync + 'static {
    move |snapshot: CatalogSnapshot| {
        let _ = player.send(PlayerEvent::CatalogChanged(snapshot.clone()).into());
        let _ = ui.send(snapshot);
    }
}
