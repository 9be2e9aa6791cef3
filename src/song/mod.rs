pub mod catalog;
pub mod hash;

use std::fs;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, ResultExt};
use lazy_regex::regex_is_match;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SongError {
    #[error("failed to parse song metadata")]
    MetadataParse,
    #[error("referenced song file not found")]
    FileNotFound,
    #[error("failed to read song directory")]
    Read,
}

pub type SongResult<T> = error_stack::Result<T, SongError>;

/// Whether `file_name` is a song metadata file (`info.dat`, any case).
pub fn is_info_file_name(file_name: &str) -> bool {
    regex_is_match!(r"(?i)^info\.dat$", file_name)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDescriptor {
    pub hash: String,
    pub name: String,
    pub artist: String,
    pub audio_file_path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BeatmapReference {
    #[serde(rename = "_beatmapFilename")]
    pub beatmap_filename: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BeatmapSet {
    #[serde(rename = "_difficultyBeatmaps", default)]
    pub difficulty_beatmaps: Vec<BeatmapReference>,
}

/// The fields of an `info.dat` this tool reads. Everything else in the file is
/// left alone; the hash is always taken over the raw bytes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SongInfo {
    #[serde(rename = "_songName")]
    pub song_name: String,
    #[serde(rename = "_songAuthorName")]
    pub song_author_name: String,
    #[serde(rename = "_songFilename")]
    pub song_filename: String,
    #[serde(rename = "_difficultyBeatmapSets")]
    pub difficulty_beatmap_sets: Vec<BeatmapSet>,
}

impl SongInfo {
    pub fn from_bytes(bytes: &[u8]) -> SongResult<Self> {
        serde_json::from_slice(bytes)
            .into_report()
            .change_context(SongError::MetadataParse)
    }

    /// Beatmaps of the first beatmap set, in metadata order. Other sets never
    /// contribute to the song identity.
    pub fn hashed_beatmaps(&self) -> &[BeatmapReference] {
        self.difficulty_beatmap_sets
            .first()
            .map(|set| set.difficulty_beatmaps.as_slice())
            .unwrap_or_default()
    }
}

pub(crate) fn read_song_file(path: &Path) -> SongResult<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(err)
            .into_report()
            .change_context(SongError::FileNotFound)
            .attach_printable(format!("Missing file: {}", path.display())),
        Err(err) => Err(err)
            .into_report()
            .change_context(SongError::Read)
            .attach_printable(format!("Failed to read {}", path.display())),
    }
}
