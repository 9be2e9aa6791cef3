use std::path::Path;

use error_stack::ResultExt;
use sha1::{Digest, Sha1};

use super::{read_song_file, SongInfo, SongResult};

/// Computes the identity hash of the song described by `info_path`.
///
/// The digest covers the raw metadata bytes followed by the raw bytes of every
/// beatmap of the first beatmap set, in metadata order. Nothing is normalized, so
/// the same files always produce the same 40 character uppercase SHA-1.
pub fn compute_hash(info_path: &Path) -> SongResult<String> {
    let info_bytes = read_song_file(info_path)?;
    let info = SongInfo::from_bytes(&info_bytes).attach_printable(format!(
        "Invalid song metadata at {}",
        info_path.display()
    ))?;
    compute_hash_with_info(info_path, &info_bytes, &info)
}

pub(crate) fn compute_hash_with_info(
    info_path: &Path,
    info_bytes: &[u8],
    info: &SongInfo,
) -> SongResult<String> {
    let song_dir = info_path.parent().unwrap_or_else(|| Path::new(""));
    let mut hasher = Sha1::new();
    hasher.update(info_bytes);
    for beatmap in info.hashed_beatmaps() {
        let beatmap_bytes = read_song_file(&song_dir.join(&beatmap.beatmap_filename))
            .attach_printable(format!(
                "Beatmap {} referenced by {}",
                beatmap.beatmap_filename,
                info_path.display()
            ))?;
        hasher.update(&beatmap_bytes);
    }
    Ok(format!("{:X}", hasher.finalize()))
}
