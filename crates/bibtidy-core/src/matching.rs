//! Token-set title similarity.
//!
//! Titles are reduced to lowercase ASCII word tokens; duplicate tokens and
//! token order do not affect the score. A score of [`EXACT`] is the only
//! threshold the reconciler accepts.

use std::collections::BTreeSet;

/// Score treated as "same title".
pub const EXACT: u8 = 100;

/// Drop non-ASCII characters, turn everything except letters, digits and `_`
/// into spaces, lowercase, trim.
fn preprocess(s: &str) -> String {
    let mapped: String = s
        .chars()
        .filter(char::is_ascii)
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    mapped.trim().to_string()
}

/// Normalized indel similarity scaled to `0..=100`. Empty input scores 0.
fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let similarity = rapidfuzz::fuzz::ratio(a.chars(), b.chars());
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

fn join_sorted<'a>(tokens: impl Iterator<Item = &'a &'a str>) -> String {
    tokens.copied().collect::<Vec<_>>().join(" ")
}

/// Token-set similarity of two titles in `0..=100`.
///
/// Compares the sorted intersection of both token sets against the
/// intersection extended with each side's leftover tokens and returns the best
/// of the three pairings. Titles without any ASCII word character score 0.
pub fn score(a: &str, b: &str) -> u8 {
    let pa = preprocess(a);
    let pb = preprocess(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }

    let tokens_a: BTreeSet<&str> = pa.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = pb.split_whitespace().collect();

    let sect = join_sorted(tokens_a.intersection(&tokens_b));
    let only_a = join_sorted(tokens_a.difference(&tokens_b));
    let only_b = join_sorted(tokens_b.difference(&tokens_a));

    let combined_a = format!("{} {}", sect, only_a).trim().to_string();
    let combined_b = format!("{} {}", sect, only_b).trim().to_string();

    ratio(&sect, &combined_a)
        .max(ratio(&sect, &combined_b))
        .max(ratio(&combined_a, &combined_b))
}

/// Whether two titles score [`EXACT`].
pub fn is_exact(a: &str, b: &str) -> bool {
    score(a, b) == EXACT
}

#[cfg(test)]
mod tests {
    use super::*;

    const TITLES: [&str; 4] = [
        "Chain Replication for Supporting High Throughput and Availability",
        "The Google File System",
        "{FARM}: Fast Remote Memory",
        "Paxos Made Simple",
    ];

    #[test]
    fn identical_titles_score_exact() {
        for t in TITLES {
            assert_eq!(score(t, t), EXACT, "{t}");
        }
    }

    #[test]
    fn score_is_symmetric() {
        for a in TITLES {
            for b in TITLES {
                assert_eq!(score(a, b), score(b, a), "{a} / {b}");
            }
        }
        let a = "Spanner: Google's Globally-Distributed Database";
        let b = "Spanner: Googles globally distributed database system";
        assert_eq!(score(a, b), score(b, a));
    }

    #[test]
    fn order_case_and_markup_are_ignored() {
        assert!(is_exact("FaRM: Fast Remote Memory", "{FARM}: fast remote memory"));
        assert!(is_exact("Paxos Made Simple", "simple made paxos"));
        assert!(is_exact("Paxos Made Simple", "Paxos Paxos Made Simple"));
    }

    #[test]
    fn token_subset_scores_exact() {
        assert!(is_exact("Paxos Made Simple", "Paxos Made Simple Revisited"));
    }

    #[test]
    fn different_titles_are_not_exact() {
        assert!(!is_exact("Paxos Made Simple", "Paxos Made Live"));
        assert!(score(TITLES[0], TITLES[1]) < EXACT);
    }

    #[test]
    fn empty_or_symbol_only_titles_score_zero() {
        assert_eq!(score("", "Paxos Made Simple"), 0);
        assert_eq!(score("Paxos Made Simple", ""), 0);
        assert_eq!(score("---", "---"), 0);
    }
}
