//! Reconciliation of bibliography entries against a curated reference corpus.
//!
//! Each entry of an input bibliography is resolved, in order, by an exact
//! title match in the corpus, by beautification for a known venue (optionally
//! persisted into that venue's record file), or by an external citation
//! lookup. Entries nothing applies to pass through unchanged.

use std::path::PathBuf;

use thiserror::Error;

pub mod beautify;
pub mod citekey;
pub mod config_file;
pub mod corpus;
pub mod format;
pub mod insert;
pub mod lookup;
pub mod matching;
pub mod reconcile;
pub mod store;
pub mod venue;

pub use beautify::beautify;
pub use citekey::generate_key;
pub use corpus::{Corpus, DEFAULT_TITLE_FILE};
pub use format::format_title;
pub use lookup::{CitationLookup, CitationRecord, LookupResult, RecordKind};
pub use reconcile::{Confirm, Reconciler, Resolved, finalize};
pub use store::VenueStore;
pub use venue::{KNOWN_VENUES, Venue};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("BibTeX error: {0}")]
    Bib(#[from] bibtidy_bib::BibError),
    #[error("required corpus file not found: {}", .0.display())]
    MissingCorpusFile(PathBuf),
    #[error("venue file not found: {}", .0.display())]
    MissingVenueFile(PathBuf),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup error: {0}")]
    Lookup(String),
}

/// How a target entry was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Replaced by a corpus entry with the same title.
    ExactMatch,
    /// Normalized for a known venue.
    Beautified,
    /// Enriched from an external citation service.
    Lookup,
    Unchanged,
}

/// Progress events emitted during reconciliation.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Checking {
        index: usize,
        total: usize,
        key: String,
        title: String,
    },
    ExactMatch {
        index: usize,
        title: String,
        matched_key: String,
    },
    VenueDetected {
        index: usize,
        venue: &'static str,
    },
    /// The beautified entry as it would be written to the venue file.
    Preview {
        index: usize,
        venue: &'static str,
        text: String,
    },
    Persisted {
        venue: &'static str,
        path: PathBuf,
    },
    PersistDeclined {
        venue: &'static str,
    },
    PersistFailed {
        venue: &'static str,
        message: String,
    },
    LookupStarted {
        index: usize,
        service: String,
    },
    LookupRejected {
        index: usize,
        service: String,
        reason: String,
    },
    Result {
        index: usize,
        total: usize,
        key: String,
        outcome: Outcome,
    },
}

/// Summary statistics for a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub exact_match: usize,
    pub beautified: usize,
    pub looked_up: usize,
    pub unchanged: usize,
    /// Beautified entries written into venue files.
    pub persisted: usize,
    /// Entries folded into another one at emission.
    pub merged: usize,
    pub emitted: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: Outcome) {
        self.total += 1;
        match outcome {
            Outcome::ExactMatch => self.exact_match += 1,
            Outcome::Beautified => self.beautified += 1,
            Outcome::Lookup => self.looked_up += 1,
            Outcome::Unchanged => self.unchanged += 1,
        }
    }
}
