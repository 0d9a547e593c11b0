//! BibTeX data model, reader and writer.
//!
//! Entries are read into a typed [`Entry`] (entry type and citation key) plus
//! an open map of lowercase field names to their textual values. Values keep
//! inner braces and LaTeX verbatim so a read/write cycle does not change how a
//! downstream renderer treats them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

use thiserror::Error;

mod parser;
mod record_file;
mod writer;

pub use parser::{ParsedEntry, parse_with_spans};
pub use record_file::RecordFile;
pub use writer::{is_month_macro, write_bibliography, write_entry, write_record_block};

/// Field that accumulates alias keys of merged entries.
pub const IDS_FIELD: &str = "ids";

#[derive(Error, Debug)]
pub enum BibError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// BibTeX entry type. Parsed case-insensitively, written lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryType {
    Article,
    Book,
    Booklet,
    Conference,
    InBook,
    InCollection,
    InProceedings,
    Manual,
    MastersThesis,
    Misc,
    PhdThesis,
    Proceedings,
    TechReport,
    Unpublished,
    Other(String),
}

impl EntryType {
    pub fn as_str(&self) -> &str {
        match self {
            EntryType::Article => "article",
            EntryType::Book => "book",
            EntryType::Booklet => "booklet",
            EntryType::Conference => "conference",
            EntryType::InBook => "inbook",
            EntryType::InCollection => "incollection",
            EntryType::InProceedings => "inproceedings",
            EntryType::Manual => "manual",
            EntryType::MastersThesis => "mastersthesis",
            EntryType::Misc => "misc",
            EntryType::PhdThesis => "phdthesis",
            EntryType::Proceedings => "proceedings",
            EntryType::TechReport => "techreport",
            EntryType::Unpublished => "unpublished",
            EntryType::Other(s) => s,
        }
    }
}

impl From<&str> for EntryType {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "article" => EntryType::Article,
            "book" => EntryType::Book,
            "booklet" => EntryType::Booklet,
            "conference" => EntryType::Conference,
            "inbook" => EntryType::InBook,
            "incollection" => EntryType::InCollection,
            "inproceedings" => EntryType::InProceedings,
            "manual" => EntryType::Manual,
            "mastersthesis" => EntryType::MastersThesis,
            "misc" => EntryType::Misc,
            "phdthesis" => EntryType::PhdThesis,
            "proceedings" => EntryType::Proceedings,
            "techreport" => EntryType::TechReport,
            "unpublished" => EntryType::Unpublished,
            other => EntryType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single bibliographic record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Entry {
    pub entry_type: EntryType,
    /// Citation key.
    pub key: String,
    /// Optional fields keyed by lowercase name.
    pub fields: BTreeMap<String, String>,
}

impl Entry {
    pub fn new(entry_type: EntryType, key: impl Into<String>) -> Self {
        Self {
            entry_type,
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.fields.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name)
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("author")
    }

    pub fn year(&self) -> Option<&str> {
        self.get("year")
    }

    /// Alias keys from the `ids` field, trimmed and deduplicated.
    pub fn aliases(&self) -> BTreeSet<String> {
        self.get(IDS_FIELD)
            .map(|ids| {
                ids.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace the `ids` field; an empty set removes it.
    pub fn set_aliases(&mut self, aliases: &BTreeSet<String>) {
        if aliases.is_empty() {
            self.fields.remove(IDS_FIELD);
        } else {
            let joined = aliases.iter().map(String::as_str).collect::<Vec<_>>().join(",");
            self.fields.insert(IDS_FIELD.to_string(), joined);
        }
    }
}

/// Parse every entry in a BibTeX string.
///
/// `@string` macros are resolved against the file's definitions; a reference
/// to an undefined macro resolves to the macro name itself. `@comment` and
/// `@preamble` blocks and free text between entries are skipped.
pub fn parse_str(content: &str) -> Result<Vec<Entry>, BibError> {
    Ok(parse_with_spans(content)?
        .into_iter()
        .map(|p| p.entry)
        .collect())
}

/// Read and parse a BibTeX file.
pub fn parse_file(path: &Path) -> Result<Vec<Entry>, BibError> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}
