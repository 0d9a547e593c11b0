//! External citation services that resolve a title to a publication record.

pub mod acm;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use bibtidy_bib::{Entry, EntryType};

pub use acm::AcmDigitalLibrary;
pub use mock::{MockLookup, MockResponse};

/// Publication kind as reported by a CSL-JSON style record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKind {
    PaperConference,
    Article,
    Other(String),
}

impl From<&str> for RecordKind {
    fn from(s: &str) -> Self {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "PAPER_CONFERENCE" => RecordKind::PaperConference,
            "ARTICLE" | "ARTICLE_JOURNAL" => RecordKind::Article,
            _ => RecordKind::Other(s.to_string()),
        }
    }
}

/// Metadata a lookup service returned for a title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRecord {
    pub title: String,
    pub kind: RecordKind,
    pub container_title: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub year: Option<i64>,
    pub month: Option<i64>,
}

/// Strings and numbers both show up for numeric CSL fields.
fn text_of(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(value: &serde_json::Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

impl CitationRecord {
    /// Build a record from a CSL-JSON object. Requires at least a title.
    pub fn from_csl(value: &serde_json::Value) -> Option<Self> {
        let title = value["title"].as_str()?.trim().to_string();
        if title.is_empty() {
            return None;
        }
        let date = &value["issued"]["date-parts"][0];
        Some(Self {
            title,
            kind: RecordKind::from(value["type"].as_str().unwrap_or_default()),
            container_title: text_of(&value["container-title"]),
            volume: text_of(&value["volume"]),
            issue: text_of(&value["issue"]),
            year: number_of(&date[0]),
            month: number_of(&date[1]),
        })
    }

    /// An entry for `target` carrying this record's venue and date.
    ///
    /// Keeps the target's type, key, title and author. Conference papers
    /// become `inproceedings` with a `booktitle`; articles become `article`
    /// with `journal`, `volume` and `number`.
    pub fn to_entry(&self, target: &Entry) -> Entry {
        let mut entry = Entry::new(target.entry_type.clone(), target.key.clone());
        for field in ["title", "author"] {
            if let Some(value) = target.get(field) {
                entry.set(field, value);
            }
        }

        match &self.kind {
            RecordKind::PaperConference => {
                entry.entry_type = EntryType::InProceedings;
                if let Some(container) = &self.container_title {
                    entry.set("booktitle", container.as_str());
                }
            }
            RecordKind::Article => {
                entry.entry_type = EntryType::Article;
                if let Some(container) = &self.container_title {
                    entry.set("journal", container.as_str());
                }
                if let Some(volume) = &self.volume {
                    entry.set("volume", volume.as_str());
                }
                if let Some(issue) = &self.issue {
                    entry.set("number", issue.as_str());
                }
            }
            RecordKind::Other(kind) => {
                tracing::warn!(kind = %kind, key = %target.key, "unhandled record type, keeping entry type");
            }
        }

        if let Some(year) = self.year {
            entry.set("year", year.to_string());
        }
        if let Some(month) = self.month {
            entry.set("month", month.to_string());
        }
        entry
    }
}

/// Outcome of asking a service about one title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(CitationRecord),
    NotFound,
    TransportError(String),
}

/// A service that can resolve a title to a [`CitationRecord`].
pub trait CitationLookup: Send + Sync {
    /// Display name (e.g. "ACM Digital Library").
    fn name(&self) -> &str;

    /// Look up a title. Failures are reported in the result, never raised.
    fn lookup<'a>(
        &'a self,
        query: &'a str,
        client: &'a reqwest::Client,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> Entry {
        Entry::new(EntryType::Misc, "abadi20")
            .with_field("title", "The Seattle Report on Database Research")
            .with_field("author", "Abadi, Daniel")
            .with_field("journal", "SIGMOD Record")
            .with_field("pages", "1--10")
    }

    #[test]
    fn parses_csl_with_mixed_value_types() {
        let value = json!({
            "type": "ARTICLE",
            "title": "The Seattle Report on Database Research",
            "container-title": "SIGMOD Rec.",
            "volume": "48",
            "issue": 4,
            "issued": { "date-parts": [[2020, "2"]] }
        });
        let record = CitationRecord::from_csl(&value).unwrap();
        assert_eq!(record.kind, RecordKind::Article);
        assert_eq!(record.container_title.as_deref(), Some("SIGMOD Rec."));
        assert_eq!(record.volume.as_deref(), Some("48"));
        assert_eq!(record.issue.as_deref(), Some("4"));
        assert_eq!(record.year, Some(2020));
        assert_eq!(record.month, Some(2));
    }

    #[test]
    fn record_without_title_is_rejected() {
        assert!(CitationRecord::from_csl(&json!({ "type": "ARTICLE" })).is_none());
    }

    #[test]
    fn article_maps_to_journal_fields() {
        let record = CitationRecord {
            title: "x".into(),
            kind: RecordKind::Article,
            container_title: Some("SIGMOD Rec.".into()),
            volume: Some("48".into()),
            issue: Some("4".into()),
            year: Some(2020),
            month: Some(2),
        };
        let entry = record.to_entry(&target());
        assert_eq!(entry.entry_type, EntryType::Article);
        assert_eq!(entry.key, "abadi20");
        assert_eq!(entry.get("journal"), Some("SIGMOD Rec."));
        assert_eq!(entry.get("number"), Some("4"));
        assert_eq!(entry.get("month"), Some("2"));
        assert_eq!(entry.author(), Some("Abadi, Daniel"));
        assert!(entry.get("pages").is_none());
    }

    #[test]
    fn conference_paper_maps_to_booktitle() {
        let record = CitationRecord {
            title: "x".into(),
            kind: RecordKind::from("PAPER_CONFERENCE"),
            container_title: Some("Proceedings of SIGMOD".into()),
            volume: Some("1".into()),
            issue: None,
            year: Some(2019),
            month: None,
        };
        let entry = record.to_entry(&target());
        assert_eq!(entry.entry_type, EntryType::InProceedings);
        assert_eq!(entry.get("booktitle"), Some("Proceedings of SIGMOD"));
        assert!(entry.get("volume").is_none());
        assert!(entry.get("month").is_none());
        assert_eq!(entry.year(), Some("2019"));
    }

    #[test]
    fn other_kinds_keep_target_type() {
        assert_eq!(RecordKind::from("book"), RecordKind::Other("book".into()));
        let record = CitationRecord {
            title: "x".into(),
            kind: RecordKind::Other("book".into()),
            container_title: None,
            volume: None,
            issue: None,
            year: None,
            month: None,
        };
        assert_eq!(record.to_entry(&target()).entry_type, EntryType::Misc);
    }
}
