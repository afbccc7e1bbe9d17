use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::warn;

mod app;
mod audio;
mod config;
mod editor;
mod error;
mod importer;
mod interruptions;
mod jobs;
mod library;
mod mpris;
mod player;
mod runtime;
mod tags;
mod ui;

use runtime::commands::{self, EditArgs};
use runtime::logging;

/// A local music library and terminal player.
#[derive(Parser, Debug)]
#[command(name = "waves", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the terminal player (the default).
    Play,
    /// Copy audio files or folders into the library.
    Import {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print every track in the library.
    List,
    /// Change a track's metadata.
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        album: Option<String>,
        /// Image file to embed as cover art.
        #[arg(long, value_name = "FILE")]
        cover: Option<PathBuf>,
        #[arg(long)]
        clear_cover: bool,
    },
    /// Remove a track and its file from the library.
    Delete { id: String },
    /// Print the effective configuration.
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (settings, config_warning) = runtime::load_settings();

    let command = cli.command.unwrap_or(Command::Play);
    match &command {
        Command::Play => {
            let log_file = settings.log_file();
            logging::init_file(&settings.log, &log_file)?;
        }
        _ => logging::init_stderr(&settings.log)?,
    }
    if let Some(msg) = config_warning {
        warn!("{msg}");
    }

    match command {
        Command::Play => runtime::run_tui(settings),
        Command::Import { paths } => commands::import(settings, paths),
        Command::List => commands::list(settings),
        Command::Edit {
            id,
            title,
            artist,
            album,
            cover,
            clear_cover,
        } => commands::edit(
            settings,
            id,
            EditArgs {
                title,
                artist,
                album,
                cover,
                clear_cover,
            },
        ),
        Command::Delete { id } => commands::delete(settings, id),
        Command::Config => commands::show_config(&settings),
    }
}
