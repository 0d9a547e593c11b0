use std::path::{Path, PathBuf};

use bibtidy_bib::Entry;

use crate::venue::Venue;

/// The per-venue record files (`<dir>/<abbr>.bib`) that live next to the
/// reference corpus.
#[derive(Debug, Clone)]
pub struct VenueStore {
    dir: PathBuf,
}

impl VenueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, venue: &Venue) -> PathBuf {
        self.dir.join(format!("{}.bib", venue.abbr))
    }

    /// The first entry of the venue's record file, used as the formatting
    /// template for new entries of that venue.
    ///
    /// The file is parsed on its own, so a bare venue macro such as
    /// `booktitle=osdi` resolves to `osdi`. A missing or malformed file
    /// yields `None`.
    pub fn load_template(&self, venue: &Venue) -> Option<Entry> {
        let path = self.path_for(venue);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                tracing::debug!(venue = %venue.abbr, path = %path.display(), error = %e, "no venue template");
                return None;
            }
        };
        match bibtidy_bib::parse_str(&content) {
            Ok(entries) => entries.into_iter().next(),
            Err(e) => {
                tracing::warn!(venue = %venue.abbr, path = %path.display(), error = %e, "unreadable venue template");
                None
            }
        }
    }
}
