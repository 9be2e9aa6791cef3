use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use error_stack::{IntoReport, Report, ResultExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to locate the config directory")]
    Path,
    #[error("failed to read the config file")]
    Read,
    #[error("failed to parse the config file")]
    Parse,
    #[error("failed to write the config file")]
    Write,
}

pub type ConfigResult<T> = error_stack::Result<T, ConfigError>;

/// Values given on the command line. `None`/`false` means "not given".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub songs_dir: Option<PathBuf>,
    pub playlists_dir: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,
    pub skip_unzip: bool,
    pub skip_sort: bool,
    pub play_audio: bool,
}

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub songs_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlists_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_unzip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_sort: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_audio: Option<bool>,
}

impl ConfigFile {
    pub fn get_config_file_path() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .ok_or(ConfigError::Path)
            .into_report()
            .attach_printable("Failed to find the user config directory")
            .map(|config_dir| config_dir.join("song-sorter").join("config.json"))
    }

    /// Reads the config file, or returns an empty one when it doesn't exist.
    pub fn read(path: &Path) -> ConfigResult<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let config_content = fs::read_to_string(path)
            .into_report()
            .change_context(ConfigError::Read)
            .attach_printable(format!("Failed to read config file at {}", path.display()))?;
        serde_json::from_str(&config_content)
            .into_report()
            .change_context(ConfigError::Parse)
            .attach_printable(format!(
                "Failed to parse the config file at {}. Ensure it is valid JSON.",
                path.display()
            ))
    }

    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let serialized = serde_json::to_string_pretty(self)
            .into_report()
            .change_context(ConfigError::Write)?;
        let folder_path = path.parent().ok_or_else(|| {
            Report::new(ConfigError::Path)
                .attach_printable(format!("{} has no parent directory", path.display()))
        })?;
        fs::create_dir_all(folder_path)
            .into_report()
            .change_context(ConfigError::Write)
            .attach_printable(format!("Failed to create directory at {}", folder_path.display()))?;
        fs::write(path, serialized)
            .into_report()
            .change_context(ConfigError::Write)
            .attach_printable(format!("Failed to write config file at {}", path.display()))?;
        Ok(())
    }
}

/// Resolved settings handed to every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SorterConfig {
    pub songs_dir: PathBuf,
    pub playlists_dir: PathBuf,
    pub downloads_dir: PathBuf,
    pub skip_unzip: bool,
    pub skip_sort: bool,
    pub play_audio: bool,
}

impl SorterConfig {
    /// Command line first, then the config file, then defaults.
    pub fn resolve(overrides: ConfigOverrides, file: ConfigFile) -> Self {
        Self {
            songs_dir: overrides
                .songs_dir
                .or(file.songs_dir)
                .unwrap_or_else(|| PathBuf::from("songs")),
            playlists_dir: overrides
                .playlists_dir
                .or(file.playlists_dir)
                .unwrap_or_else(|| PathBuf::from("playlists")),
            downloads_dir: overrides
                .downloads_dir
                .or(file.downloads_dir)
                .or_else(dirs::download_dir)
                .unwrap_or_else(|| PathBuf::from("downloads")),
            skip_unzip: overrides.skip_unzip || file.skip_unzip.unwrap_or(false),
            skip_sort: overrides.skip_sort || file.skip_sort.unwrap_or(false),
            play_audio: overrides.play_audio || file.play_audio.unwrap_or(false),
        }
    }

    pub fn load(overrides: ConfigOverrides) -> ConfigResult<Self> {
        let path = ConfigFile::get_config_file_path()?;
        let file = ConfigFile::read(&path)?;
        Ok(Self::resolve(overrides, file))
    }

    pub fn to_file(&self) -> ConfigFile {
        ConfigFile {
            songs_dir: Some(self.songs_dir.clone()),
            playlists_dir: Some(self.playlists_dir.clone()),
            downloads_dir: Some(self.downloads_dir.clone()),
            skip_unzip: Some(self.skip_unzip),
            skip_sort: Some(self.skip_sort),
            play_audio: Some(self.play_audio),
        }
    }
}

impl fmt::Display for SorterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "songs:      {}", self.songs_dir.display())?;
        writeln!(f, "playlists:  {}", self.playlists_dir.display())?;
        writeln!(f, "downloads:  {}", self.downloads_dir.display())?;
        writeln!(f, "skip unzip: {}", self.skip_unzip)?;
        writeln!(f, "skip sort:  {}", self.skip_sort)?;
        write!(f, "play audio: {}", self.play_audio)
    }
}
