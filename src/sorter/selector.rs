use colored::Colorize;
use error_stack::ResultExt;

use crate::dialoguer::Dialoguer;
use crate::song::SongDescriptor;

use super::{PlaylistSelector, SorterError, SorterResult};

/// Asks on the terminal which playlist an unsorted song belongs to.
#[derive(Debug, Default, Clone)]
pub struct DialoguerSelector;

impl PlaylistSelector for DialoguerSelector {
    fn select(&mut self, song: &SongDescriptor, options: &[String]) -> SorterResult<Option<usize>> {
        let prompt_text = format!(
            "Song '{}' by {} is not in any playlist.\nAdd '{}' to playlist",
            song.name.clone().cyan(),
            song.artist.clone().yellow(),
            song.name
        );
        Dialoguer::select(prompt_text, options, None).change_context(SorterError::Selection)
    }
}
