use colored::Colorize;
use error_stack::{Report, ResultExt};
use tracing::{info, warn};

use crate::config::SorterConfig;
use crate::playlist::PlaylistStore;
use crate::preview::system_preview;
use crate::song::catalog::SongCatalog;
use crate::Suggestion;

use super::selector::DialoguerSelector;
use super::{run, unsorted, SortSummary, SorterError, SorterResult};

pub struct SortCommands;

impl SortCommands {
    /// Scans songs and playlists from scratch, then prompts for every unsorted song.
    pub fn sort(config: &SorterConfig) -> SorterResult<SortSummary> {
        let store = PlaylistStore::new(&config.playlists_dir);
        let playlists = store
            .list_playlists()
            .change_context(SorterError::Playlist)?;
        let known = store.known_hashes().change_context(SorterError::Playlist)?;
        let catalog = SongCatalog::scan(&config.songs_dir).change_context(SorterError::Catalog)?;
        info!(
            "{} songs, {} playlists, {} known hashes",
            catalog.len(),
            playlists.len(),
            known.len()
        );
        if unsorted(&catalog, &known).is_empty() {
            println!("{}", "Every song is already in a playlist".green());
            return Ok(SortSummary::default());
        }
        if playlists.is_empty() {
            return Err(Report::new(SorterError::Playlist)
                .attach_printable(format!(
                    "No playlists found in {}",
                    config.playlists_dir.display()
                ))
                .attach(Suggestion(format!(
                    "create a .bplist file under {} or pass --playlists",
                    config.playlists_dir.display()
                ))));
        }

        let mut preview = if config.play_audio {
            match system_preview() {
                Ok(preview) => Some(preview),
                Err(report) => {
                    warn!("Audio preview disabled: {:?}", report);
                    None
                }
            }
        } else {
            None
        };
        let summary = run(
            &catalog,
            &known,
            &playlists,
            &mut DialoguerSelector,
            preview.as_deref_mut(),
        )?;
        println!(
            "{} unsorted songs: {} added, {} skipped",
            summary.unsorted.to_string().cyan(),
            summary.added.to_string().green(),
            summary.skipped.to_string().yellow()
        );
        Ok(summary)
    }

    pub fn print_unsorted(config: &SorterConfig) -> SorterResult<()> {
        let known = PlaylistStore::new(&config.playlists_dir)
            .known_hashes()
            .change_context(SorterError::Playlist)?;
        let catalog = SongCatalog::scan(&config.songs_dir).change_context(SorterError::Catalog)?;
        let pending = unsorted(&catalog, &known);
        for song in &pending {
            println!(
                "{} - {} {}",
                song.name.clone().cyan(),
                song.artist,
                song.hash.clone().dimmed()
            );
        }
        println!(
            "{} of {} songs are not in any playlist",
            pending.len().to_string().yellow(),
            catalog.len()
        );
        Ok(())
    }

    pub fn print_playlists(config: &SorterConfig) -> SorterResult<()> {
        let store = PlaylistStore::new(&config.playlists_dir);
        let playlists = store
            .list_playlists()
            .change_context(SorterError::Playlist)?;
        for (index, playlist) in playlists.iter().enumerate() {
            let entries =
                PlaylistStore::read_entries(&playlist.path).change_context(SorterError::Playlist)?;
            println!(
                "{:>3}. {} ({} songs)",
                index + 1,
                playlist.name.clone().cyan(),
                entries.len()
            );
        }
        Ok(())
    }
}
