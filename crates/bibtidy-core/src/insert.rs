//! Chronological insertion into venue record files.

use bibtidy_bib::{Entry, RecordFile, write_record_block};

use crate::CoreError;
use crate::store::VenueStore;
use crate::venue::Venue;

/// Numeric year from the leading digits of the `year` field.
pub fn entry_year(entry: &Entry) -> Option<u32> {
    let year = entry.year()?.trim();
    let digits: String = year.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Index of the first entry strictly later than `year`; `None` means append.
///
/// Entries without a numeric year never count as later, and a new entry
/// without one always goes to the end.
pub fn insertion_index<'a>(entries: impl Iterator<Item = &'a Entry>, year: Option<u32>) -> Option<usize> {
    let year = year?;
    entries
        .map(entry_year)
        .position(|existing| existing.is_some_and(|y| y > year))
}

/// Serialize `entry` the way venue files are written: the venue macro and
/// month macros bare, everything else braced.
pub fn record_text(entry: &Entry, venue: &Venue) -> String {
    write_record_block(entry, &|name, value| {
        (name == "booktitle" || name == "journal") && value == venue.abbr
    })
}

impl VenueStore {
    /// Insert `entry` into the venue's record file, after every entry of the
    /// same or an earlier year. The file must already exist and is assumed to
    /// be sorted ascending by year; it is rewritten in one write.
    pub fn insert(&self, entry: &Entry, venue: &Venue) -> Result<(), CoreError> {
        let path = self.path_for(venue);
        if !path.is_file() {
            return Err(CoreError::MissingVenueFile(path));
        }
        let source = std::fs::read_to_string(&path)?;
        let mut file = RecordFile::parse(&source)?;

        let text = record_text(entry, venue);
        let index = insertion_index(file.entries(), entry_year(entry));
        match index {
            Some(index) => file.insert_before(index, entry.clone(), text),
            None => file.push(entry.clone(), text),
        }

        std::fs::write(&path, file.render())?;
        tracing::info!(venue = %venue.abbr, path = %path.display(), key = %entry.key, "entry added to venue file");
        Ok(())
    }
}
