use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use error_stack::fmt::{Charset, ColorMode};
use error_stack::{Report, ResultExt};
use tracing_subscriber::EnvFilter;

use crate::config::{ConfigFile, ConfigOverrides, SorterConfig};
use crate::dialoguer::Dialoguer;
use crate::song::catalog::SongCatalog;
use crate::sorter::commands::SortCommands;
use crate::unzip::Unzipper;

mod config;
mod dialoguer;
mod playlist;
mod preview;
mod song;
mod sorter;
mod unzip;

#[derive(Debug)]
pub struct SongSorterError;
impl fmt::Display for SongSorterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Song sorter error")
    }
}
impl std::error::Error for SongSorterError {}

pub type SongSorterResult<T> = error_stack::Result<T, SongSorterError>;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Unzip custom songs and sort them into playlists")]
struct Cli {
    #[command(flatten)]
    options: CliOptions,
    #[command(subcommand)]
    command: Option<SongSorterCommands>,
}

#[derive(Args, Debug, Clone)]
struct CliOptions {
    /// Folder holding one subfolder per song
    #[arg(long, global = true)]
    songs: Option<PathBuf>,
    /// Folder searched recursively for .bplist playlists
    #[arg(long, global = true)]
    playlists: Option<PathBuf>,
    /// Folder where downloaded song archives land
    #[arg(long, global = true)]
    downloads: Option<PathBuf>,
    /// Don't unzip downloaded archives
    #[arg(long, global = true, action)]
    skip_unzip: bool,
    /// Don't prompt for unsorted songs
    #[arg(long, global = true, action)]
    skip_sort: bool,
    /// Play each song while choosing its playlist
    #[arg(long, global = true, action)]
    play_audio: bool,
}

impl From<CliOptions> for ConfigOverrides {
    fn from(options: CliOptions) -> Self {
        Self {
            songs_dir: options.songs,
            playlists_dir: options.playlists,
            downloads_dir: options.downloads,
            skip_unzip: options.skip_unzip,
            skip_sort: options.skip_sort,
            play_audio: options.play_audio,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq, Clone)]
enum SongSorterCommands {
    /// Unzip new downloads, then pick a playlist for every unsorted song (default)
    Sort,
    /// Only unzip downloaded song archives into the songs folder
    Unzip,
    /// List the songs that are not in any playlist
    Unsorted,
    /// List the playlists in selection order
    Playlists,
    /// Print the hash of one song folder
    Hash {
        /// Song folder containing an info.dat
        song_dir: PathBuf,
    },
    /// Print the resolved configuration
    Config {
        /// Store the resolved configuration as the new defaults
        #[clap(long, action)]
        save: bool,
    },
}

impl SongSorterCommands {
    pub fn execute(&self, config: &SorterConfig) -> SongSorterResult<()> {
        match self {
            SongSorterCommands::Sort => {
                if config.skip_unzip {
                    println!("{}", "Skipping unzip".yellow());
                } else {
                    Self::unzip(config)?;
                }
                if config.skip_sort {
                    println!("{}", "Skipping sort".yellow());
                    return Ok(());
                }
                SortCommands::sort(config).change_context(SongSorterError)?;
                Ok(())
            }
            SongSorterCommands::Unzip => Self::unzip(config),
            SongSorterCommands::Unsorted => {
                SortCommands::print_unsorted(config).change_context(SongSorterError)
            }
            SongSorterCommands::Playlists => {
                SortCommands::print_playlists(config).change_context(SongSorterError)
            }
            SongSorterCommands::Hash { song_dir } => {
                let song = SongCatalog::describe_dir(song_dir).change_context(SongSorterError)?;
                println!("{} {}", song.hash, song.name.cyan());
                Ok(())
            }
            SongSorterCommands::Config { save } => {
                println!("Current config:\n{}", config);
                if !*save {
                    return Ok(());
                }
                let path = ConfigFile::get_config_file_path().change_context(SongSorterError)?;
                if path.is_file() {
                    let prompt_text = format!("Overwrite {}?", path.display());
                    let overwrite =
                        Dialoguer::select_yes_or_no(prompt_text).change_context(SongSorterError)?;
                    if !overwrite {
                        return Ok(());
                    }
                }
                config
                    .to_file()
                    .save(&path)
                    .change_context(SongSorterError)?;
                println!("Config saved to {}", path.display().to_string().green());
                Ok(())
            }
        }
    }

    fn unzip(config: &SorterConfig) -> SongSorterResult<()> {
        if !config.downloads_dir.is_dir() {
            return Err(Report::new(SongSorterError)
                .attach_printable(format!(
                    "Downloads folder {} does not exist",
                    config.downloads_dir.display()
                ))
                .attach(Suggestion(
                    "pass --downloads or use --skip-unzip".to_string(),
                )));
        }
        let summary = Unzipper::extract_downloads(&config.downloads_dir, &config.songs_dir)
            .change_context(SongSorterError)?;
        for archive in summary.not_songs {
            println!("{} {}", "Not a song archive:".dimmed(), archive.display());
        }
        for archive in summary.already_present {
            println!(
                "{} {}",
                "Already unzipped, left in place:".yellow(),
                archive.display()
            );
        }
        Ok(())
    }
}

pub struct Suggestion(pub String);

impl Suggestion {
    pub fn set_report() {
        Report::set_charset(Charset::Utf8);
        Report::set_color_mode(ColorMode::Color);
        Report::install_debug_hook::<Self>(|Self(value), context| {
            context.push_body(format!("{}: {value}", "suggestion".yellow()))
        });
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> SongSorterResult<()> {
    let cli = Cli::parse();

    Suggestion::set_report();
    init_tracing();

    let config = SorterConfig::load(cli.options.into()).change_context(SongSorterError)?;
    cli.command
        .unwrap_or(SongSorterCommands::Sort)
        .execute(&config)
}

fn main() -> SongSorterResult<()> {
    run()
}
