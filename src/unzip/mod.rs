use std::fs::{self, File};
use std::path::{Path, PathBuf};

use colored::Colorize;
use error_stack::{IntoReport, ResultExt};
use indicatif::{ProgressBar, ProgressStyle};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::song::is_info_file_name;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnzipError {
    #[error("failed to extract song archive")]
    ArchiveExtraction,
    #[error("failed to read downloads")]
    Read,
    #[error("failed to write songs")]
    Write,
}

pub type UnzipResult<T> = error_stack::Result<T, UnzipError>;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnzipSummary {
    /// Song folders created under the songs root.
    pub extracted: Vec<PathBuf>,
    /// Archives left in place because their song folder already exists.
    pub already_present: Vec<PathBuf>,
    /// Archives without an `info.dat`, left untouched.
    pub not_songs: Vec<PathBuf>,
}

pub struct Unzipper;

impl Unzipper {
    /// Extracts every song archive directly under `downloads_root` into
    /// `songs_root/<archive name>` and removes the archive afterwards.
    pub fn extract_downloads(downloads_root: &Path, songs_root: &Path) -> UnzipResult<UnzipSummary> {
        let archives = Self::list_archives(downloads_root)?;
        let mut summary = UnzipSummary::default();
        if archives.is_empty() {
            debug!("No archives in {}", downloads_root.display());
            return Ok(summary);
        }
        fs::create_dir_all(songs_root)
            .into_report()
            .change_context(UnzipError::Write)
            .attach_printable(format!("Failed to create {}", songs_root.display()))?;

        let pb = ProgressBar::new(archives.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.white/blue}] {pos}/{len}")
                .into_report()
                .change_context(UnzipError::Read)?
                .progress_chars("█  "),
        );
        for archive_path in archives {
            pb.set_message(format!("Unzipping {}", archive_path.display().to_string().cyan()));
            let mut archive = Self::open_archive(&archive_path)?;
            let Some(song_root) = Self::song_root(&archive) else {
                debug!("{} has no info.dat, leaving it", archive_path.display());
                summary.not_songs.push(archive_path);
                pb.inc(1);
                continue;
            };
            let destination = songs_root.join(Self::song_folder_name(&archive_path));
            if destination.exists() {
                warn!(
                    "{} already exists, skipping {}",
                    destination.display(),
                    archive_path.display()
                );
                summary.already_present.push(archive_path);
                pb.inc(1);
                continue;
            }
            Self::extract_into(&mut archive, &archive_path, &song_root, songs_root, &destination)?;
            fs::remove_file(&archive_path)
                .into_report()
                .change_context(UnzipError::Write)
                .attach_printable(format!("Failed to remove {}", archive_path.display()))?;
            summary.extracted.push(destination);
            pb.inc(1);
        }
        pb.finish_with_message(format!(
            "{} songs unzipped",
            summary.extracted.len().to_string().green()
        ));
        Ok(summary)
    }

    fn list_archives(downloads_root: &Path) -> UnzipResult<Vec<PathBuf>> {
        let mut archives = fs::read_dir(downloads_root)
            .into_report()
            .change_context(UnzipError::Read)
            .attach_printable(format!(
                "Failed to read downloads directory {}",
                downloads_root.display()
            ))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|extension| extension.to_str())
                        .map(|extension| extension.eq_ignore_ascii_case("zip"))
                        .unwrap_or(false)
            })
            .collect::<Vec<_>>();
        archives.sort();
        Ok(archives)
    }

    fn open_archive(archive_path: &Path) -> UnzipResult<ZipArchive<File>> {
        let file = File::open(archive_path)
            .into_report()
            .change_context(UnzipError::Read)
            .attach_printable(format!("Failed to open {}", archive_path.display()))?;
        ZipArchive::new(file)
            .into_report()
            .change_context(UnzipError::ArchiveExtraction)
            .attach_printable(format!("Corrupt archive {}", archive_path.display()))
    }

    /// Folder inside the archive holding `info.dat`: the archive root or a single
    /// top-level folder, root preferred. `None` when the archive is not a song.
    fn song_root(archive: &ZipArchive<File>) -> Option<PathBuf> {
        let mut roots = archive
            .file_names()
            .filter_map(|name| {
                let mut parts = name
                    .split(['/', '\\'])
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>();
                let file_name = parts.pop()?;
                (is_info_file_name(file_name) && parts.len() <= 1)
                    .then(|| parts.into_iter().collect::<PathBuf>())
            })
            .collect::<Vec<_>>();
        roots.sort();
        roots.into_iter().next()
    }

    fn song_folder_name(archive_path: &Path) -> String {
        archive_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Extracts into a hidden staging folder inside the songs root, then renames
    /// the song folder into place. A failed extraction leaves nothing behind.
    fn extract_into(
        archive: &mut ZipArchive<File>,
        archive_path: &Path,
        song_root: &Path,
        songs_root: &Path,
        destination: &Path,
    ) -> UnzipResult<()> {
        let staging = TempDir::new_in(songs_root)
            .into_report()
            .change_context(UnzipError::Write)?;
        archive
            .extract(staging.path())
            .into_report()
            .change_context(UnzipError::ArchiveExtraction)
            .attach_printable(format!("Failed to extract {}", archive_path.display()))?;
        let extracted = if song_root.as_os_str().is_empty() {
            staging.path().to_path_buf()
        } else {
            staging.path().join(song_root)
        };
        fs::rename(&extracted, destination)
            .into_report()
            .change_context(UnzipError::Write)
            .attach_printable(format!("Failed to move song to {}", destination.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::FileOptions;
    use zip::ZipWriter;

    use super::*;

    fn write_archive(path: &Path, entries: &[(&str, &str)]) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());
        for (name, contents) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_extracts_song_archives_and_removes_them() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let archive = downloads.path().join("1a2b (Song - Mapper).zip");
        write_archive(&archive, &[("Info.dat", "{}"), ("Expert.dat", "notes")]);

        let summary = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap();

        let song_dir = songs.path().join("1a2b (Song - Mapper)");
        assert_eq!(summary.extracted, vec![song_dir.clone()]);
        assert_eq!(fs::read_to_string(song_dir.join("Expert.dat")).unwrap(), "notes");
        assert!(song_dir.join("Info.dat").is_file());
        assert!(!archive.exists());
        // Only the song folder remains, no staging leftovers.
        assert_eq!(fs::read_dir(songs.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_existing_song_folder_is_skipped() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let archive = downloads.path().join("song.zip");
        write_archive(&archive, &[("info.dat", "{}")]);
        fs::create_dir(songs.path().join("song")).unwrap();

        let summary = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap();

        assert!(summary.extracted.is_empty());
        assert_eq!(summary.already_present, vec![archive.clone()]);
        assert!(archive.exists());
    }

    #[test]
    fn test_archive_without_info_is_left_alone() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let archive = downloads.path().join("photos.zip");
        write_archive(&archive, &[("cat.png", "meow")]);
        fs::write(downloads.path().join("readme.txt"), "not an archive").unwrap();

        let summary = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap();

        assert_eq!(summary.not_songs, vec![archive.clone()]);
        assert!(archive.exists());
        assert!(!songs.path().join("photos").exists());
    }

    #[test]
    fn test_corrupt_archive_is_extraction_error() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        fs::write(downloads.path().join("broken.zip"), "definitely not a zip").unwrap();

        let report = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap_err();
        assert_eq!(report.current_context(), &UnzipError::ArchiveExtraction);
    }

    #[test]
    fn test_single_top_level_folder_is_flattened() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let archive = downloads.path().join("nested.zip");
        write_archive(
            &archive,
            &[("Song/Info.dat", "{}"), ("Song/Expert.dat", "notes")],
        );

        let summary = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap();

        let song_dir = songs.path().join("nested");
        assert_eq!(summary.extracted, vec![song_dir.clone()]);
        assert!(song_dir.join("Info.dat").is_file());
        assert_eq!(fs::read_to_string(song_dir.join("Expert.dat")).unwrap(), "notes");
        assert!(!song_dir.join("Song").exists());
        assert_eq!(fs::read_dir(songs.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_deeply_nested_info_is_not_a_song() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let archive = downloads.path().join("deep.zip");
        write_archive(&archive, &[("a/b/Info.dat", "{}")]);

        let summary = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap();

        assert_eq!(summary.not_songs, vec![archive.clone()]);
        assert!(archive.exists());
    }

    #[test]
    fn test_empty_downloads_is_a_no_op() {
        let downloads = TempDir::new().unwrap();
        let songs = TempDir::new().unwrap();
        let summary = Unzipper::extract_downloads(downloads.path(), songs.path()).unwrap();
        assert_eq!(summary, UnzipSummary::default());
    }
}
