//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};

use crate::app::{App, EditField, EditForm, Mode, NoticeKind};
use crate::config::ControlsSettings;
use crate::library::format_mmss;

const LEFT_PAD: Padding = Padding {
    left: 1,
    right: 0,
    top: 0,
    bottom: 0,
};

/// Render the controls help text, incorporating scrub seconds.
fn controls_text(scrub_seconds: u64) -> String {
    [
        ("j/k", "up/down".to_string()),
        ("enter", "play selected".to_string()),
        ("space/p", "play/pause".to_string()),
        ("h/l", "prev/next".to_string()),
        ("H/L", format!("scrub -/+{scrub_seconds}s")),
        ("x", "stop".to_string()),
        ("r", "repeat".to_string()),
        ("s", "shuffle".to_string()),
        ("i", "details".to_string()),
        ("a", "import".to_string()),
        ("e", "edit".to_string()),
        ("d", "delete".to_string()),
        ("esc", "dismiss".to_string()),
        ("q", "quit".to_string()),
    ]
    .iter()
    .map(|(k, v)| format!("[{k}] {v}"))
    .collect::<Vec<String>>()
    .join(" | ")
}

fn on_off(b: bool) -> &'static str {
    if b { "ON" } else { "OFF" }
}

fn status_text(app: &App) -> String {
    let mut parts: Vec<String> = Vec::new();
    let transport = &app.transport;

    match app.now_playing() {
        Some(track) => {
            parts.push(format!(
                "Song: {} [{} / {}]",
                track.display(),
                format_mmss(app.display_elapsed()),
                format_mmss(transport.total)
            ));
            parts.push(if transport.playing { "Playing" } else { "Paused" }.to_string());
        }
        None => parts.push("Stopped".to_string()),
    }

    parts.push(format!("Repeat: {}", on_off(transport.repeat)));
    parts.push(format!("Shuffle: {}", on_off(transport.shuffle)));
    if let Some(busy) = &app.busy {
        parts.push(busy.clone());
    }
    parts.join(" • ")
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

fn details_text(app: &App) -> String {
    let Some(track) = app.selected_track() else {
        return "No track selected".to_string();
    };
    let mut lines = vec![
        format!("Title: {}", track.title),
        format!("Artist: {}", track.artist.as_deref().unwrap_or("-")),
        format!("Album: {}", track.album.as_deref().unwrap_or("-")),
    ];
    lines.extend(
        track
            .details()
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}")),
    );
    if track.cover_art.is_some() {
        lines.push("Artwork: embedded".to_string());
    }
    lines.join("\n")
}

fn edit_form_text(form: &EditForm) -> String {
    EditField::ALL
        .iter()
        .map(|&field| {
            let marker = if field == form.field { "> " } else { "  " };
            let cursor = if field == form.field { "_" } else { "" };
            let value = match field {
                EditField::Cover if form.clear_cover => "(remove artwork)".to_string(),
                EditField::Cover if form.cover.is_empty() && field != form.field => {
                    "(keep current)".to_string()
                }
                _ => format!("{}{cursor}", form.value(field)),
            };
            format!("{marker}{}: {value}", field.label())
        })
        .collect::<Vec<String>>()
        .join("\n")
}

/// The single line between the list and the footer: prompts take priority
/// over notices.
fn message_line(app: &App) -> Line<'_> {
    match &app.mode {
        Mode::ImportPrompt { input } => Line::from(format!("Import path: {input}_")).bold(),
        Mode::ConfirmDelete(_) => {
            let title = app
                .selected_track()
                .map(|t| t.display())
                .unwrap_or_default();
            Line::from(format!("Delete \"{title}\"? [y/n]")).fg(Color::Yellow)
        }
        Mode::Edit(_) => Line::from(
            "tab/up/down: field | enter: save | del: remove artwork | esc: cancel",
        )
        .bold(),
        Mode::Normal => match &app.notice {
            Some(n) if n.kind == NoticeKind::Error => {
                Line::from(format!("{} (esc to dismiss)", n.message)).fg(Color::Red)
            }
            Some(n) => Line::from(n.message.as_str()),
            None => Line::default(),
        },
    }
}

/// Render the entire UI into the provided `frame`.
pub fn draw(frame: &mut Frame, app: &App, controls_settings: &ControlsSettings) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(4),
        ])
        .split(frame.area());

    let header = Paragraph::new(format!("{} tracks in library", app.tracks.len()))
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" waves ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status = Paragraph::new(status_text(app))
        .block(Block::bordered().padding(LEFT_PAD).title(" status "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[1]);

    // Main list: only build items for the visible window, centred on the selection.
    {
        let total = app.tracks.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let sel_pos = app.selected_index().unwrap_or(0);
        let (start, end) = if total <= list_height || list_height == 0 {
            (0, total)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height)
        };

        let playing_id = app.transport.track_id.as_ref();
        let items: Vec<ListItem> = app.tracks[start..end]
            .iter()
            .map(|track| {
                let marker = if Some(&track.id) == playing_id { "♪ " } else { "  " };
                let duration = track.duration.map(format_mmss).unwrap_or_default();
                ListItem::new(format!("{marker}{}  {duration}", track.display()))
            })
            .collect();

        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(" tracks "))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if total > 0 && app.selected_index().is_some() {
            state.select(Some(sel_pos - start));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
        if !app.has_tracks() {
            let hint = Paragraph::new("library is empty, press a to import")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" tracks "));
            frame.render_widget(hint, chunks[2]);
        }

        if app.details_window {
            let popup_area = centered_rect_sized(72, 12, chunks[2]);
            frame.render_widget(Clear, popup_area);
            let details = Paragraph::new(details_text(app))
                .block(
                    Block::default()
                        .padding(LEFT_PAD)
                        .borders(Borders::ALL)
                        .title(" details (i closes) "),
                )
                .wrap(Wrap { trim: true });
            frame.render_widget(details, popup_area);
        }

        if let Mode::Edit(form) = &app.mode {
            let popup_area = centered_rect_sized(72, 6, chunks[2]);
            frame.render_widget(Clear, popup_area);
            let editor = Paragraph::new(edit_form_text(form)).block(
                Block::default()
                    .padding(LEFT_PAD)
                    .borders(Borders::ALL)
                    .title(" edit track "),
            );
            frame.render_widget(editor, popup_area);
        }
    }

    frame.render_widget(Paragraph::new(message_line(app)), chunks[3]);

    let footer = Paragraph::new(controls_text(controls_settings.scrub_seconds))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(LEFT_PAD),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[4]);
}
