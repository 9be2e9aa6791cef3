use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, Report, ResultExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};
use walkdir::WalkDir;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaylistError {
    #[error("failed to parse playlist")]
    Parse,
    #[error("failed to read playlist")]
    Read,
    #[error("failed to write playlist")]
    Write,
    #[error("failed to discover playlists")]
    Discovery,
}

pub type PlaylistResult<T> = error_stack::Result<T, PlaylistError>;

pub const PLAYLIST_EXTENSION: &str = "bplist";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_name: Option<String>,
    #[serde(default)]
    pub hash: Option<String>,
}

/// Read-only view of a playlist: only the song list matters when collecting hashes.
#[derive(Debug, Deserialize)]
struct PlaylistSongs {
    #[serde(default)]
    songs: Vec<PlaylistEntry>,
}

/// One playlist file as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistFile {
    pub path: PathBuf,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct PlaylistStore {
    root: PathBuf,
}

impl PlaylistStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Every `.bplist` file under the root, recursively, sorted by path.
    /// A missing root lists nothing. Symlinked files and folders are followed.
    pub fn list_playlists(&self) -> PlaylistResult<Vec<PlaylistFile>> {
        let mut playlists = Vec::new();
        if !self.root.exists() {
            debug!("Playlists directory {} does not exist", self.root.display());
            return Ok(playlists);
        }
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry
                .into_report()
                .change_context(PlaylistError::Discovery)
                .attach_printable(format!(
                    "Failed to walk playlists directory {}",
                    self.root.display()
                ))?;
            let is_playlist = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|extension| extension == PLAYLIST_EXTENSION)
                    .unwrap_or(false);
            if is_playlist {
                playlists.push(PlaylistFile {
                    name: self.display_name(entry.path()),
                    path: entry.into_path(),
                });
            }
        }
        Ok(playlists)
    }

    /// Union of the hashes referenced by every playlist, uppercased.
    pub fn known_hashes(&self) -> PlaylistResult<HashSet<String>> {
        let mut known = HashSet::new();
        for playlist in self.list_playlists()? {
            for entry in Self::read_entries(&playlist.path)? {
                if let Some(hash) = entry.hash {
                    known.insert(hash.to_uppercase());
                }
            }
        }
        debug!("Collected {} known hashes", known.len());
        Ok(known)
    }

    pub fn read_entries(playlist_path: &Path) -> PlaylistResult<Vec<PlaylistEntry>> {
        let content = Self::read_playlist_file(playlist_path)?;
        let playlist: PlaylistSongs = serde_json::from_str(&content)
            .into_report()
            .change_context(PlaylistError::Parse)
            .attach_printable(format!("Invalid playlist at {}", playlist_path.display()))?;
        Ok(playlist.songs)
    }

    /// Appends `{songName, hash}` to the playlist's `songs`, keeping every other
    /// field. The new document is written to a sibling temp file and renamed over
    /// the original, so a failure never leaves a half-written playlist.
    pub fn append_song(playlist_path: &Path, song_name: &str, hash: &str) -> PlaylistResult<()> {
        let content = Self::read_playlist_file(playlist_path)?;
        let mut document: Value = serde_json::from_str(&content)
            .into_report()
            .change_context(PlaylistError::Parse)
            .attach_printable(format!("Invalid playlist at {}", playlist_path.display()))?;
        let fields = document.as_object_mut().ok_or_else(|| {
            Report::new(PlaylistError::Parse).attach_printable(format!(
                "Playlist at {} is not a JSON object",
                playlist_path.display()
            ))
        })?;
        Self::songs_mut(fields, playlist_path)?.push(
            serde_json::to_value(PlaylistEntry {
                song_name: Some(song_name.to_string()),
                hash: Some(hash.to_string()),
            })
            .into_report()
            .change_context(PlaylistError::Write)?,
        );
        let serialized = serde_json::to_string_pretty(&document)
            .into_report()
            .change_context(PlaylistError::Write)?;
        Self::replace_file(playlist_path, serialized.as_bytes())?;
        info!("Added {} ({}) to {}", song_name, hash, playlist_path.display());
        Ok(())
    }

    /// Path relative to the root with the extension stripped, e.g. `pop/favorites`.
    pub fn display_name(&self, playlist_path: &Path) -> String {
        let relative = playlist_path
            .strip_prefix(&self.root)
            .unwrap_or(playlist_path);
        relative
            .with_extension("")
            .to_string_lossy()
            .into_owned()
    }

    fn songs_mut<'a>(
        fields: &'a mut Map<String, Value>,
        playlist_path: &Path,
    ) -> PlaylistResult<&'a mut Vec<Value>> {
        fields
            .entry("songs")
            .or_insert_with(|| Value::Array(Vec::new()))
            .as_array_mut()
            .ok_or_else(|| {
                Report::new(PlaylistError::Parse).attach_printable(format!(
                    "Field `songs` of {} is not an array",
                    playlist_path.display()
                ))
            })
    }

    fn read_playlist_file(playlist_path: &Path) -> PlaylistResult<String> {
        fs::read_to_string(playlist_path)
            .into_report()
            .change_context(PlaylistError::Read)
            .attach_printable(format!(
                "Failed to read playlist at {}",
                playlist_path.display()
            ))
    }

    fn replace_file(playlist_path: &Path, contents: &[u8]) -> PlaylistResult<()> {
        let parent = playlist_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(parent)
            .into_report()
            .change_context(PlaylistError::Write)
            .attach_printable(format!("Failed to stage a write in {}", parent.display()))?;
        staged
            .write_all(contents)
            .and_then(|_| staged.as_file().sync_all())
            .into_report()
            .change_context(PlaylistError::Write)?;
        // The staged file is created 0600; keep the playlist's own mode.
        let permissions = fs::metadata(playlist_path)
            .into_report()
            .change_context(PlaylistError::Write)
            .attach_printable(format!(
                "Failed to read permissions of {}",
                playlist_path.display()
            ))?
            .permissions();
        staged
            .as_file()
            .set_permissions(permissions)
            .into_report()
            .change_context(PlaylistError::Write)?;
        staged
            .persist(playlist_path)
            .map_err(|err| err.error)
            .into_report()
            .change_context(PlaylistError::Write)
            .attach_printable(format!(
                "Failed to replace playlist at {}",
                playlist_path.display()
            ))?;
        Ok(())
    }
}
