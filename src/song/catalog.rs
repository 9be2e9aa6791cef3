use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, ResultExt};
use tracing::debug;

use super::hash::compute_hash_with_info;
use super::{is_info_file_name, read_song_file, SongDescriptor, SongError, SongInfo, SongResult};

/// Every song found under a songs root, keyed by hash and kept in scan order.
#[derive(Debug, Default, Clone)]
pub struct SongCatalog {
    songs: Vec<SongDescriptor>,
    positions: HashMap<String, usize>,
}

impl SongCatalog {
    /// Scans the immediate subdirectories of `songs_root`, sorted by name.
    /// Symlinked folders are followed and hidden ones are ignored.
    ///
    /// Folders without an `info.dat` are skipped. Any unreadable metadata or
    /// missing beatmap aborts the whole scan.
    pub fn scan(songs_root: &Path) -> SongResult<Self> {
        let mut catalog = Self::default();
        for song_dir in Self::song_dirs(songs_root)? {
            let Some(info_path) = Self::find_info_file(&song_dir)? else {
                debug!("No info.dat in {}, skipping", song_dir.display());
                continue;
            };
            let descriptor = Self::describe(&song_dir, &info_path)?;
            debug!("Hashed {} as {}", song_dir.display(), descriptor.hash);
            catalog.insert(descriptor);
        }
        Ok(catalog)
    }

    /// Reads a single song folder. Fails with `FileNotFound` when it has no `info.dat`.
    pub fn describe_dir(song_dir: &Path) -> SongResult<SongDescriptor> {
        let info_path = Self::find_info_file(song_dir)?
            .ok_or(SongError::FileNotFound)
            .into_report()
            .attach_printable(format!("No info.dat in {}", song_dir.display()))?;
        Self::describe(song_dir, &info_path)
    }

    /// Returns the first directory entry named `info.dat` ignoring case, in name order.
    pub fn find_info_file(song_dir: &Path) -> SongResult<Option<PathBuf>> {
        let mut names = fs::read_dir(song_dir)
            .into_report()
            .change_context(SongError::Read)
            .attach_printable(format!("Failed to list {}", song_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| is_info_file_name(name))
            .collect::<Vec<_>>();
        names.sort();
        Ok(names.into_iter().next().map(|name| song_dir.join(name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &SongDescriptor> {
        self.songs.iter()
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    fn insert(&mut self, descriptor: SongDescriptor) {
        // Same hash means same content, the later folder replaces the earlier one.
        match self.positions.get(&descriptor.hash) {
            Some(position) => self.songs[*position] = descriptor,
            None => {
                self.positions
                    .insert(descriptor.hash.clone(), self.songs.len());
                self.songs.push(descriptor);
            }
        }
    }

    fn song_dirs(songs_root: &Path) -> SongResult<Vec<PathBuf>> {
        let mut dirs = fs::read_dir(songs_root)
            .into_report()
            .change_context(SongError::Read)
            .attach_printable(format!(
                "Failed to read songs directory {}",
                songs_root.display()
            ))?
            .filter_map(|entry| entry.ok())
            // Hidden folders hold staging leftovers, never songs.
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();
        dirs.sort();
        Ok(dirs)
    }

    fn describe(song_dir: &Path, info_path: &Path) -> SongResult<SongDescriptor> {
        let info_bytes = read_song_file(info_path)?;
        let info = SongInfo::from_bytes(&info_bytes).attach_printable(format!(
            "Invalid song metadata at {}",
            info_path.display()
        ))?;
        let hash = compute_hash_with_info(info_path, &info_bytes, &info)?;
        Ok(SongDescriptor {
            hash,
            audio_file_path: song_dir.join(&info.song_filename),
            name: info.song_name,
            artist: info.song_author_name,
        })
    }
}
