//! The reference corpus: every curated entry the tool can match against.

use std::path::{Path, PathBuf};

use bibtidy_bib::Entry;

use crate::CoreError;
use crate::matching::is_exact;

/// Default name of the file holding shared `@string` definitions and
/// hand-curated entries. It is always read first.
pub const DEFAULT_TITLE_FILE: &str = "title.bib";

/// Ordered, append-only collection of reference entries.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<Entry>,
}

impl Corpus {
    pub fn new(entries: Vec<Entry>) -> Self {
        Self { entries }
    }

    /// Corpus files in read order: `title_file` first, then every other
    /// `*.bib` whose name does not start with `title`, sorted by name.
    pub fn discover(dir: &Path, title_file: &str) -> Result<Vec<PathBuf>, CoreError> {
        let title_path = dir.join(title_file);
        if !title_path.is_file() {
            return Err(CoreError::MissingCorpusFile(title_path));
        }

        let mut others = Vec::new();
        for dir_entry in std::fs::read_dir(dir)? {
            let path = dir_entry?.path();
            if !path.is_file() || path == title_path {
                continue;
            }
            let is_bib = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("bib"));
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if is_bib && !name.starts_with("title") {
                others.push(path);
            }
        }
        others.sort();

        let mut files = vec![title_path];
        files.extend(others);
        Ok(files)
    }

    /// Load the corpus from `dir`. All files are concatenated and parsed as a
    /// single bibliography so macros from the title file apply everywhere.
    pub fn load(dir: &Path, title_file: &str) -> Result<Self, CoreError> {
        let files = Self::discover(dir, title_file)?;
        let mut combined = String::new();
        for path in &files {
            combined.push_str(&std::fs::read_to_string(path)?);
            combined.push('\n');
        }
        let entries = bibtidy_bib::parse_str(&combined)?;
        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            entries = entries.len(),
            "reference corpus loaded"
        );
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry; later lookups see it.
    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    /// Every entry whose title matches `title` exactly, in corpus order.
    pub fn exact_matches<'a>(&'a self, title: &str) -> Vec<&'a Entry> {
        self.entries
            .iter()
            .filter(|e| e.title().is_some_and(|t| is_exact(title, t)))
            .collect()
    }

    /// The corpus entry to use for `target`: among exact title matches, the
    /// first with the same entry type, else the first.
    pub fn best_match(&self, target: &Entry) -> Option<&Entry> {
        let title = target.title()?;
        let matches = self.exact_matches(title);
        if matches.len() > 1 {
            tracing::debug!(key = %target.key, candidates = matches.len(), "several exact matches");
        }
        matches
            .iter()
            .find(|e| e.entry_type == target.entry_type)
            .or_else(|| matches.first())
            .copied()
    }
}
