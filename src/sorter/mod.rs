pub mod commands;
pub mod selector;

use std::collections::HashSet;

use colored::Colorize;
use error_stack::{Report, ResultExt};
use thiserror::Error;
use tracing::{debug, warn};

use crate::playlist::{PlaylistFile, PlaylistStore};
use crate::preview::AudioPreview;
use crate::song::catalog::SongCatalog;
use crate::song::SongDescriptor;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SorterError {
    #[error("failed to select a playlist")]
    Selection,
    #[error("failed to scan songs")]
    Catalog,
    #[error("failed to update playlists")]
    Playlist,
}

pub type SorterResult<T> = error_stack::Result<T, SorterError>;

/// First option of every prompt; index 0 never maps to a playlist.
pub const SKIP_OPTION: &str = "SKIP";

/// Chooses where an unsorted song goes.
pub trait PlaylistSelector {
    /// Returns an index into `options`, or `None` to stop sorting.
    fn select(&mut self, song: &SongDescriptor, options: &[String]) -> SorterResult<Option<usize>>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortSummary {
    pub unsorted: usize,
    pub added: usize,
    pub skipped: usize,
}

/// Songs whose hash is not referenced by any playlist, in catalog order.
pub fn unsorted<'a>(catalog: &'a SongCatalog, known: &HashSet<String>) -> Vec<&'a SongDescriptor> {
    catalog
        .iter()
        .filter(|song| !known.contains(&song.hash))
        .collect()
}

/// `SKIP` followed by the display name of every playlist, in listing order.
pub fn selection_options(playlists: &[PlaylistFile]) -> Vec<String> {
    std::iter::once(SKIP_OPTION.to_string())
        .chain(playlists.iter().map(|playlist| playlist.name.clone()))
        .collect()
}

/// One pass over the unsorted songs: prompt, then append, one song at a time.
///
/// `playlists` must be the same listing the options were built from, since the
/// selected index is resolved against it.
pub fn run(
    catalog: &SongCatalog,
    known: &HashSet<String>,
    playlists: &[PlaylistFile],
    selector: &mut dyn PlaylistSelector,
    mut preview: Option<&mut (dyn AudioPreview + 'static)>,
) -> SorterResult<SortSummary> {
    let pending = unsorted(catalog, known);
    let options = selection_options(playlists);
    let mut summary = SortSummary {
        unsorted: pending.len(),
        ..SortSummary::default()
    };

    for song in pending {
        if let Some(preview) = preview.as_deref_mut() {
            if let Err(report) = preview.play(&song.audio_file_path) {
                warn!("Could not preview {}: {:?}", song.name, report);
            }
        }
        let selection = selector.select(song, &options);
        if let Some(preview) = preview.as_deref_mut() {
            preview.stop();
        }

        match selection? {
            None => {
                debug!("Sorting stopped before {}", song.hash);
                break;
            }
            Some(0) => summary.skipped += 1,
            Some(index) => {
                let playlist = playlists.get(index - 1).ok_or_else(|| {
                    Report::new(SorterError::Selection)
                        .attach_printable(format!("No playlist for option {}", index))
                })?;
                PlaylistStore::append_song(&playlist.path, &song.name, &song.hash)
                    .change_context(SorterError::Playlist)?;
                println!(
                    "Added {} to {}",
                    song.name.clone().green(),
                    playlist.name.clone().cyan()
                );
                summary.added += 1;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::fs;
    use std::path::{Path, PathBuf};

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::preview::PreviewResult;
    use crate::song::fixtures::write_song;

    struct ScriptedSelector {
        answers: VecDeque<Option<usize>>,
        prompted: Vec<(String, Vec<String>)>,
    }

    impl ScriptedSelector {
        fn new(answers: Vec<Option<usize>>) -> Self {
            Self {
                answers: answers.into(),
                prompted: Vec::new(),
            }
        }
    }

    impl PlaylistSelector for ScriptedSelector {
        fn select(
            &mut self,
            song: &SongDescriptor,
            options: &[String],
        ) -> SorterResult<Option<usize>> {
            self.prompted.push((song.name.clone(), options.to_vec()));
            Ok(self.answers.pop_front().unwrap_or(Some(0)))
        }
    }

    #[derive(Default)]
    struct RecordingPreview {
        played: Vec<PathBuf>,
        stops: usize,
    }

    impl AudioPreview for RecordingPreview {
        fn play(&mut self, audio_path: &Path) -> PreviewResult<()> {
            self.played.push(audio_path.to_path_buf());
            Ok(())
        }

        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    struct Library {
        _songs: TempDir,
        playlists: TempDir,
        catalog: SongCatalog,
        store: PlaylistStore,
    }

    /// Songs A and B, and one playlist that already holds A.
    fn library() -> Library {
        let songs = TempDir::new().unwrap();
        write_song(songs.path(), "a", "Song A", &[("Expert.dat", "a notes")]);
        write_song(songs.path(), "b", "Song B", &[("Expert.dat", "b notes")]);
        let catalog = SongCatalog::scan(songs.path()).unwrap();
        let hash_a = catalog
            .iter()
            .find(|song| song.name == "Song A")
            .unwrap()
            .hash
            .clone();

        let playlists = TempDir::new().unwrap();
        fs::write(
            playlists.path().join("favorites.bplist"),
            serde_json::to_string(&json!({
                "playlistTitle": "Favorites",
                "songs": [ { "hash": hash_a, "songName": "Song A" } ]
            }))
            .unwrap(),
        )
        .unwrap();
        let store = PlaylistStore::new(playlists.path());
        Library {
            _songs: songs,
            playlists,
            catalog,
            store,
        }
    }

    #[test]
    fn test_unsorted_is_catalog_minus_known() {
        let library = library();
        let known = library.store.known_hashes().unwrap();
        let pending = unsorted(&library.catalog, &known);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "Song B");
        // Nothing was appended, so a second computation matches the first.
        let known_again = library.store.known_hashes().unwrap();
        assert_eq!(unsorted(&library.catalog, &known_again), pending);
    }

    #[test]
    fn test_selection_options_start_with_skip() {
        let library = library();
        let playlists = library.store.list_playlists().unwrap();
        assert_eq!(
            selection_options(&playlists),
            vec!["SKIP".to_string(), "favorites".to_string()]
        );
    }

    #[test]
    fn test_run_appends_selected_song_then_nothing_is_left() {
        let library = library();
        let playlists = library.store.list_playlists().unwrap();
        let known = library.store.known_hashes().unwrap();
        let mut selector = ScriptedSelector::new(vec![Some(1)]);

        let summary = run(&library.catalog, &known, &playlists, &mut selector, None).unwrap();
        assert_eq!(
            summary,
            SortSummary {
                unsorted: 1,
                added: 1,
                skipped: 0
            }
        );
        assert_eq!(selector.prompted.len(), 1);
        assert_eq!(selector.prompted[0].0, "Song B");

        let entries =
            PlaylistStore::read_entries(&library.playlists.path().join("favorites.bplist")).unwrap();
        let last = entries.last().unwrap();
        assert_eq!(last.song_name.as_deref(), Some("Song B"));
        let hash_b = &library
            .catalog
            .iter()
            .find(|song| song.name == "Song B")
            .unwrap()
            .hash;
        assert_eq!(last.hash.as_ref(), Some(hash_b));

        let known = library.store.known_hashes().unwrap();
        assert!(unsorted(&library.catalog, &known).is_empty());
        let mut selector = ScriptedSelector::new(vec![]);
        let summary = run(&library.catalog, &known, &playlists, &mut selector, None).unwrap();
        assert_eq!(summary.unsorted, 0);
        assert!(selector.prompted.is_empty());
    }

    #[test]
    fn test_skip_leaves_playlists_untouched() {
        let library = library();
        let playlist_path = library.playlists.path().join("favorites.bplist");
        let before = fs::read_to_string(&playlist_path).unwrap();
        let playlists = library.store.list_playlists().unwrap();
        let known = library.store.known_hashes().unwrap();
        let mut selector = ScriptedSelector::new(vec![Some(0)]);

        let summary = run(&library.catalog, &known, &playlists, &mut selector, None).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.added, 0);
        assert_eq!(fs::read_to_string(&playlist_path).unwrap(), before);
    }

    #[test]
    fn test_quit_stops_the_pass() {
        let library = library();
        let playlists = library.store.list_playlists().unwrap();
        let mut selector = ScriptedSelector::new(vec![None]);

        let summary = run(&library.catalog, &HashSet::new(), &playlists, &mut selector, None).unwrap();
        assert_eq!(selector.prompted.len(), 1);
        assert_eq!(summary.unsorted, 2);
        assert_eq!(summary.added + summary.skipped, 0);
    }

    #[test]
    fn test_out_of_range_selection_is_error() {
        let library = library();
        let playlists = library.store.list_playlists().unwrap();
        let known = library.store.known_hashes().unwrap();
        let mut selector = ScriptedSelector::new(vec![Some(5)]);

        let report = run(&library.catalog, &known, &playlists, &mut selector, None).unwrap_err();
        assert_eq!(report.current_context(), &SorterError::Selection);
    }

    #[test]
    fn test_preview_plays_each_prompted_song_and_stops() {
        let library = library();
        let playlists = library.store.list_playlists().unwrap();
        let mut selector = ScriptedSelector::new(vec![Some(0), Some(0)]);
        let mut preview = RecordingPreview::default();

        run(
            &library.catalog,
            &HashSet::new(),
            &playlists,
            &mut selector,
            Some(&mut preview),
        )
        .unwrap();
        assert_eq!(preview.played.len(), 2);
        assert_eq!(preview.stops, 2);
        assert!(preview.played[0].ends_with("song.egg"));
    }
}
