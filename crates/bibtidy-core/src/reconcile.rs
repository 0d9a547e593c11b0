//! The per-entry decision procedure and the emission step.

use bibtidy_bib::{Entry, EntryType, IDS_FIELD};

use crate::beautify::beautify;
use crate::corpus::Corpus;
use crate::insert::record_text;
use crate::lookup::{CitationLookup, LookupResult};
use crate::matching::is_exact;
use crate::store::VenueStore;
use crate::venue::{self, Venue};
use crate::{Outcome, ProgressEvent, RunStats};

/// Venue substrings that send an entry to the external lookup.
const LOOKUP_VENUES: [&str; 2] = ["vldb", "sigmod"];

/// Yes/no decisions asked of the user.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

fn ignore_progress(_: ProgressEvent) {}

/// Whether an entry qualifies for the external lookup: an article or
/// conference paper whose venue (`booktitle` preferred) mentions one of
/// [`LOOKUP_VENUES`].
pub fn wants_lookup(entry: &Entry) -> bool {
    if !matches!(entry.entry_type, EntryType::Article | EntryType::InProceedings) {
        return false;
    }
    let venue = entry
        .get("booktitle")
        .or_else(|| entry.get("journal"))
        .unwrap_or_default()
        .to_lowercase();
    LOOKUP_VENUES.iter().any(|v| venue.contains(v))
}

/// Resolves target entries one at a time against the corpus, the venue
/// store and an optional lookup service.
pub struct Reconciler<'a> {
    corpus: &'a mut Corpus,
    store: &'a VenueStore,
    lookup: Option<&'a dyn CitationLookup>,
    client: &'a reqwest::Client,
    confirm: &'a mut dyn Confirm,
    current_year: i32,
    progress: &'a dyn Fn(ProgressEvent),
    stats: RunStats,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        corpus: &'a mut Corpus,
        store: &'a VenueStore,
        client: &'a reqwest::Client,
        confirm: &'a mut dyn Confirm,
        current_year: i32,
    ) -> Self {
        Self {
            corpus,
            store,
            lookup: None,
            client,
            confirm,
            current_year,
            progress: &ignore_progress,
            stats: RunStats::default(),
        }
    }

    pub fn with_lookup(mut self, lookup: &'a dyn CitationLookup) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn Fn(ProgressEvent)) -> Self {
        self.progress = progress;
        self
    }

    /// Reconcile every target in order and emit the deduplicated result.
    pub async fn run(mut self, targets: &[Entry]) -> (Vec<Entry>, RunStats) {
        let total = targets.len();
        let mut resolved = Vec::with_capacity(total);
        for (index, target) in targets.iter().enumerate() {
            resolved.push(self.reconcile_entry(index, total, target).await);
        }
        let emitted = finalize(resolved);
        self.stats.merged = total - emitted.len();
        self.stats.emitted = emitted.len();
        (emitted, self.stats)
    }

    /// Resolve a single target and attach its alias set.
    pub async fn reconcile_entry(&mut self, index: usize, total: usize, target: &Entry) -> Resolved {
        let title = target.title().unwrap_or_default().to_string();
        (self.progress)(ProgressEvent::Checking {
            index,
            total,
            key: target.key.clone(),
            title: title.clone(),
        });

        let matched = self.corpus.best_match(target).cloned();
        let (result, outcome) = if let Some(found) = matched {
            tracing::debug!(key = %target.key, matched = %found.key, "exact title match");
            (self.progress)(ProgressEvent::ExactMatch {
                index,
                title,
                matched_key: found.key.clone(),
            });
            (found, Outcome::ExactMatch)
        } else if let Some(venue) = venue::detect(target) {
            (self.beautify_known(index, target, venue), Outcome::Beautified)
        } else if let Some(entry) = self.external_lookup(index, target).await {
            (entry, Outcome::Lookup)
        } else {
            tracing::debug!(key = %target.key, "left unchanged");
            (target.clone(), Outcome::Unchanged)
        };

        let record = match outcome {
            Outcome::ExactMatch | Outcome::Beautified => Some(result.key.clone()),
            Outcome::Lookup | Outcome::Unchanged => None,
        };
        let entry = attach_aliases(result, target, outcome);
        self.stats.record(outcome);
        (self.progress)(ProgressEvent::Result {
            index,
            total,
            key: entry.key.clone(),
            outcome,
        });
        Resolved {
            entry,
            outcome,
            record,
        }
    }

    fn beautify_known(&mut self, index: usize, target: &Entry, venue: &'static Venue) -> Entry {
        (self.progress)(ProgressEvent::VenueDetected {
            index,
            venue: venue.abbr,
        });
        let template = self.store.load_template(venue);
        let beautified = beautify(target, template.as_ref(), venue, self.current_year);
        (self.progress)(ProgressEvent::Preview {
            index,
            venue: venue.abbr,
            text: record_text(&beautified, venue),
        });

        let path = self.store.path_for(venue);
        let question = format!("Add {} to {}?", beautified.key, path.display());
        if !self.confirm.confirm(&question) {
            (self.progress)(ProgressEvent::PersistDeclined { venue: venue.abbr });
            return beautified;
        }

        match self.store.insert(&beautified, venue) {
            Ok(()) => {
                self.corpus.push(beautified.clone());
                self.stats.persisted += 1;
                (self.progress)(ProgressEvent::Persisted {
                    venue: venue.abbr,
                    path,
                });
            }
            Err(e) => {
                tracing::warn!(venue = %venue.abbr, error = %e, "could not add entry to venue file");
                (self.progress)(ProgressEvent::PersistFailed {
                    venue: venue.abbr,
                    message: e.to_string(),
                });
            }
        }
        beautified
    }

    async fn external_lookup(&self, index: usize, target: &Entry) -> Option<Entry> {
        let lookup = self.lookup?;
        if !wants_lookup(target) {
            return None;
        }
        let title = target.title()?;
        let service = lookup.name().to_string();
        (self.progress)(ProgressEvent::LookupStarted {
            index,
            service: service.clone(),
        });

        let reason = match lookup.lookup(title, self.client).await {
            LookupResult::Found(record) if is_exact(&record.title, title) => {
                tracing::debug!(key = %target.key, service = %service, "lookup accepted");
                return Some(record.to_entry(target));
            }
            LookupResult::Found(record) => format!("title mismatch: {}", record.title),
            LookupResult::NotFound => "no result".to_string(),
            LookupResult::TransportError(message) => message,
        };
        (self.progress)(ProgressEvent::LookupRejected {
            index,
            service,
            reason,
        });
        None
    }
}

/// A reconciled entry and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub entry: Entry,
    pub outcome: Outcome,
    /// Key of the corpus or beautified record the entry stands for; `None`
    /// for looked-up and unchanged entries.
    pub record: Option<String>,
}

/// Merge the alias sets of `result` and `target` and pick the final key:
/// the beautified key for beautified entries, the target's key otherwise.
fn attach_aliases(mut result: Entry, target: &Entry, outcome: Outcome) -> Entry {
    let mut aliases = result.aliases();
    aliases.extend(target.aliases());
    aliases.insert(target.key.clone());
    if outcome != Outcome::Beautified {
        result.key = target.key.clone();
    }
    aliases.remove(&result.key);
    result.set_aliases(&aliases);
    result
}

fn same_record(a: &Entry, b: &Entry) -> bool {
    let content = |e: &Entry| {
        e.fields
            .iter()
            .filter(|(name, _)| name.as_str() != IDS_FIELD)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<Vec<_>>()
    };
    a.entry_type == b.entry_type && content(a) == content(b)
}

fn absorb(survivor: &mut Entry, other: &Entry) {
    let mut aliases = survivor.aliases();
    aliases.extend(other.aliases());
    aliases.insert(other.key.clone());
    aliases.remove(&survivor.key);
    survivor.set_aliases(&aliases);
}

/// `key` followed by the smallest number from 2 up that no emitted entry uses.
fn free_key(key: &str, out: &[Resolved], incoming: &str) -> String {
    (2..)
        .map(|n| format!("{key}{n}"))
        .find(|k| k != incoming && out.iter().all(|r| r.entry.key != *k))
        .unwrap_or_else(|| key.to_string())
}

/// Prepare reconciled entries for output, keeping input order.
///
/// Exact duplicates are dropped. Entries standing for the same corpus or
/// beautified record are merged into the first one, which gains the others'
/// keys and aliases. Entries sharing a key are folded together only when they
/// hold the same record; otherwise both are kept and a generated (beautified)
/// key is renumbered, so no entry is lost and no two emitted entries share a
/// key.
pub fn finalize(resolved: Vec<Resolved>) -> Vec<Entry> {
    let mut out: Vec<Resolved> = Vec::with_capacity(resolved.len());
    for mut item in resolved {
        if out.iter().any(|r| r.entry == item.entry) {
            continue;
        }
        if let Some(survivor) = out.iter_mut().find(|r| {
            r.record.is_some() && r.record == item.record && same_record(&r.entry, &item.entry)
        }) {
            tracing::debug!(survivor = %survivor.entry.key, merged = %item.entry.key, "merged duplicate record");
            absorb(&mut survivor.entry, &item.entry);
            continue;
        }
        let Some(pos) = out.iter().position(|r| r.entry.key == item.entry.key) else {
            out.push(item);
            continue;
        };
        if same_record(&out[pos].entry, &item.entry) {
            absorb(&mut out[pos].entry, &item.entry);
            continue;
        }
        if item.outcome != Outcome::Beautified && out[pos].outcome == Outcome::Beautified {
            let renamed = free_key(&out[pos].entry.key, &out, &item.entry.key);
            tracing::warn!(key = %item.entry.key, renamed = %renamed, "citation key taken by another entry, renaming the generated key");
            out[pos].entry.key = renamed;
        } else {
            let renamed = free_key(&item.entry.key, &out, &item.entry.key);
            tracing::warn!(key = %item.entry.key, renamed = %renamed, "citation key taken by another entry, renaming");
            item.entry.key = renamed;
        }
        out.push(item);
    }
    out.into_iter().map(|r| r.entry).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(key: &str, title: &str) -> Entry {
        Entry::new(EntryType::InProceedings, key)
            .with_field("title", title)
            .with_field("year", "2020")
    }

    fn resolved(entry: Entry, outcome: Outcome, record: Option<&str>) -> Resolved {
        Resolved {
            entry,
            outcome,
            record: record.map(String::from),
        }
    }

    fn unchanged(entry: Entry) -> Resolved {
        resolved(entry, Outcome::Unchanged, None)
    }

    #[test]
    fn exact_duplicates_appear_once() {
        let a = paper("a", "Raft");
        let out = finalize(vec![
            unchanged(a.clone()),
            unchanged(paper("b", "Paxos")),
            unchanged(a.clone()),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], a);
    }

    #[test]
    fn unmatched_entries_differing_only_in_key_are_kept() {
        let a = Entry::new(EntryType::Misc, "a")
            .with_field("title", "Some Blog Post")
            .with_field("note", "online");
        let mut b = a.clone();
        b.key = "b".into();
        let out = finalize(vec![unchanged(a.clone()), unchanged(b.clone())]);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn targets_resolved_to_one_record_merge_aliases() {
        let a = paper("a", "Raft").with_field("ids", "old-a");
        let b = paper("b", "Raft").with_field("ids", "old-b");
        let out = finalize(vec![
            resolved(a, Outcome::ExactMatch, Some("ongaro14raft")),
            resolved(b, Outcome::ExactMatch, Some("ongaro14raft")),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "a");
        assert_eq!(out[0].get("ids"), Some("b,old-a,old-b"));
    }

    #[test]
    fn same_key_same_record_folds_aliases() {
        let first = paper("k", "Raft");
        let second = paper("k", "Raft").with_field("ids", "p");
        let out = finalize(vec![unchanged(first), unchanged(second)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("ids"), Some("p"));
    }

    #[test]
    fn key_collision_between_papers_keeps_both() {
        let filed = paper("lamport98paxos", "The Part-Time Parliament");
        let generated = paper("lamport98paxos", "Paxos Made Live");
        let out = finalize(vec![
            unchanged(filed),
            resolved(generated, Outcome::Beautified, Some("lamport98paxos")),
        ]);
        let titles: Vec<_> = out.iter().filter_map(Entry::title).collect();
        assert_eq!(titles, vec!["The Part-Time Parliament", "Paxos Made Live"]);
        assert_eq!(out[0].key, "lamport98paxos");
        assert_eq!(out[1].key, "lamport98paxos2");
    }

    #[test]
    fn generated_key_gives_way_to_a_later_user_key() {
        let generated = paper("lamport98paxos", "Paxos Made Live");
        let filed = paper("lamport98paxos", "The Part-Time Parliament");
        let out = finalize(vec![
            resolved(generated, Outcome::Beautified, Some("lamport98paxos")),
            unchanged(filed),
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].key, "lamport98paxos2");
        assert_eq!(out[0].title(), Some("Paxos Made Live"));
        assert_eq!(out[1].key, "lamport98paxos");
    }

    #[test]
    fn aliases_exclude_final_key() {
        let target = paper("t", "Raft").with_field("ids", "x");
        let corpus_entry = paper("c", "Raft").with_field("ids", "t");
        let out = attach_aliases(corpus_entry, &target, Outcome::ExactMatch);
        assert_eq!(out.key, "t");
        assert_eq!(out.get("ids"), Some("x"));

        let bare_corpus_entry = paper("c", "Raft");
        let bare_target = paper("t", "Raft");
        let out = attach_aliases(bare_corpus_entry, &bare_target, Outcome::ExactMatch);
        assert_eq!(out.key, "t");
        assert!(out.get("ids").is_none(), "corpus key is not an alias");

        let unchanged = attach_aliases(target.clone(), &target, Outcome::Unchanged);
        assert_eq!(unchanged, target);

        let beautified = attach_aliases(paper("ongaro14raft", "Raft"), &target, Outcome::Beautified);
        assert_eq!(beautified.key, "ongaro14raft");
        assert_eq!(beautified.get("ids"), Some("t,x"));
    }

    #[test]
    fn lookup_requires_type_and_venue() {
        let sigmod = paper("a", "x").with_field("booktitle", "Proceedings of ACM SIGMOD");
        assert!(wants_lookup(&sigmod));
        let vldb = Entry::new(EntryType::Article, "b").with_field("journal", "PVLDB");
        assert!(wants_lookup(&vldb));
        let misc = Entry::new(EntryType::Misc, "c").with_field("journal", "PVLDB");
        assert!(!wants_lookup(&misc));
        let both = paper("d", "x")
            .with_field("booktitle", "OSDI")
            .with_field("journal", "PVLDB");
        assert!(!wants_lookup(&both));
    }

    #[test]
    fn closures_confirm() {
        let mut asked = Vec::new();
        let mut confirm = |q: &str| {
            asked.push(q.to_string());
            true
        };
        assert!(Confirm::confirm(&mut confirm, "Add?"));
        assert_eq!(asked, vec!["Add?"]);
    }
}
