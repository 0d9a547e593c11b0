//! Known venues and detection of which one an entry was published at.

use bibtidy_bib::{Entry, EntryType};

/// Field that names where an entry was published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerField {
    BookTitle,
    Journal,
}

impl ContainerField {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainerField::BookTitle => "booktitle",
            ContainerField::Journal => "journal",
        }
    }

    pub fn other(self) -> Self {
        match self {
            ContainerField::BookTitle => ContainerField::Journal,
            ContainerField::Journal => ContainerField::BookTitle,
        }
    }

    /// Entry type implied by publishing through this field.
    pub fn entry_type(self) -> EntryType {
        match self {
            ContainerField::BookTitle => EntryType::InProceedings,
            ContainerField::Journal => EntryType::Article,
        }
    }
}

/// A recognized venue: its bare abbreviation (also the name of its record
/// file and `@string` macro) and the month it usually takes place in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Venue {
    pub abbr: &'static str,
    pub month: Option<&'static str>,
}

const fn conference(abbr: &'static str, month: &'static str) -> Venue {
    Venue {
        abbr,
        month: Some(month),
    }
}

const fn journal(abbr: &'static str) -> Venue {
    Venue { abbr, month: None }
}

/// Detection order. Venues resolved through the external lookup (`vldb`,
/// `sigmod`) are not listed.
pub static KNOWN_VENUES: &[Venue] = &[
    conference("osdi", "jul"),
    conference("sosp", "oct"),
    conference("nsdi", "apr"),
    conference("eurosys", "apr"),
    conference("asplos", "mar"),
    conference("sigcomm", "aug"),
    conference("socc", "nov"),
    conference("hotos", "may"),
    conference("podc", "jul"),
    conference("ppopp", "feb"),
    conference("isca", "jun"),
    conference("fast", "feb"),
    journal("tocs"),
    journal("cacm"),
];

/// The container field an entry's venue is read from (`journal` wins over
/// `booktitle`) together with its value.
pub fn detected_field(entry: &Entry) -> Option<(ContainerField, &str)> {
    if let Some(journal) = entry.get(ContainerField::Journal.as_str()) {
        return Some((ContainerField::Journal, journal));
    }
    entry
        .get(ContainerField::BookTitle.as_str())
        .map(|b| (ContainerField::BookTitle, b))
}

/// First known venue whose abbreviation occurs in the entry's container field.
pub fn detect(entry: &Entry) -> Option<&'static Venue> {
    let (_, value) = detected_field(entry)?;
    let value = value.to_lowercase();
    let venue = KNOWN_VENUES.iter().find(|v| value.contains(v.abbr));
    if let Some(v) = venue {
        tracing::debug!(venue = %v.abbr, key = %entry.key, "venue detected");
    }
    venue
}

/// Look a venue up by its abbreviation.
pub fn find(abbr: &str) -> Option<&'static Venue> {
    KNOWN_VENUES.iter().find(|v| v.abbr.eq_ignore_ascii_case(abbr))
}
