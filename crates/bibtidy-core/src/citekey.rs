//! Citation keys of the form `<lastname><yy><firstword>`.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use bibtidy_bib::Entry;

const PARTICLES: [&str; 9] = ["van", "von", "de", "der", "den", "del", "da", "le", "la"];

const STOP_WORDS: [&str; 10] = ["a", "an", "the", "on", "in", "at", "for", "to", "of", "with"];

/// A LaTeX command that takes a braced argument, e.g. `\emph{` or `\c{`.
static COMMAND_WITH_ARG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[A-Za-z]+\{").unwrap());

fn is_particle(token: &str) -> bool {
    PARTICLES.contains(&token.to_lowercase().as_str())
}

/// Fold to lowercase ASCII: strip LaTeX command names, braces and backslashes,
/// decompose accented letters and keep only ASCII letters and digits (plus
/// whitespace, so titles can still be split into words).
fn fold(s: &str) -> String {
    let stripped = COMMAND_WITH_ARG.replace_all(s, "");
    stripped
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn fold_word(s: &str) -> String {
    fold(s).split_whitespace().collect()
}

/// Surname of a single author name, folded to ASCII.
///
/// `Last, First` takes everything before the comma, dropping leading
/// particles; `First Last` takes the final token.
pub fn last_name(name: &str) -> String {
    let surname = match name.split_once(',') {
        Some((before, _)) => {
            let tokens: Vec<&str> = before.split_whitespace().collect();
            let mut start = 0;
            while start + 1 < tokens.len() && is_particle(tokens[start]) {
                start += 1;
            }
            tokens[start..].concat()
        }
        None => name.split_whitespace().last().unwrap_or_default().to_string(),
    };
    fold_word(&surname)
}

fn year_suffix(year: Option<&str>) -> String {
    match year.map(str::trim).filter(|y| !y.is_empty()) {
        Some(y) => {
            let chars: Vec<char> = y.chars().collect();
            chars[chars.len().saturating_sub(2)..].iter().collect()
        }
        None => "00".to_string(),
    }
}

/// First title word that is not a stop word, or `paper`.
fn first_word(title: &str) -> String {
    fold(title)
        .split_whitespace()
        .find(|w| !STOP_WORDS.contains(w))
        .unwrap_or("paper")
        .to_string()
}

/// Generate the canonical key for `entry`.
///
/// Without an author the existing key is kept; without a title the key is
/// just `<lastname><yy>`.
pub fn generate_key(entry: &Entry) -> String {
    let Some(authors) = entry.author() else {
        return entry.key.clone();
    };
    let first_author = authors.split(" and ").next().unwrap_or_default().trim();
    let mut key = last_name(first_author);
    key.push_str(&year_suffix(entry.year()));
    if let Some(title) = entry.title() {
        key.push_str(&first_word(title));
    }
    key
}
