use std::collections::HashMap;
use std::ops::Range;

use biblatex::{RawBibliography, RawChunk, Spanned};

use crate::{BibError, Entry, EntryType};

/// An entry together with the byte range of its source text (`@` through the
/// closing brace).
#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub entry: Entry,
    pub span: Range<usize>,
}

/// Parse all entries, keeping the source span of each one.
///
/// Uses `biblatex`'s raw layer so `@string` references stay visible: they are
/// resolved here against the file's own definitions, and a reference to an
/// undefined macro becomes the macro name itself.
pub fn parse_with_spans(content: &str) -> Result<Vec<ParsedEntry>, BibError> {
    let raw = RawBibliography::parse(content).map_err(|e| BibError::Syntax {
        line: line_at(content, e.span.start),
        message: e.kind.to_string(),
    })?;

    let mut macros: HashMap<String, String> = HashMap::new();
    for pair in &raw.abbreviations {
        let value = resolve(&pair.value.v, &macros);
        macros.insert(pair.key.v.to_ascii_lowercase(), value);
    }

    Ok(raw
        .entries
        .iter()
        .map(|spanned| {
            let raw_entry = &spanned.v;
            let mut entry = Entry::new(EntryType::from(raw_entry.kind.v), raw_entry.key.v);
            for pair in &raw_entry.fields {
                let value = resolve(&pair.value.v, &macros);
                entry.set(pair.key.v, value.split_whitespace().collect::<Vec<_>>().join(" "));
            }
            ParsedEntry {
                entry,
                span: spanned.span.start..closing_brace_end(content, spanned.span.end),
            }
        })
        .collect())
}

fn line_at(src: &str, pos: usize) -> usize {
    src[..pos.min(src.len())].matches('\n').count() + 1
}

/// The raw entry span stops at the closing brace; include it.
fn closing_brace_end(src: &str, end: usize) -> usize {
    match src.get(end..).map(|rest| rest.trim_start()) {
        Some(rest) if rest.starts_with('}') => src.len() - rest.len() + 1,
        _ => end,
    }
}

/// Concatenate the `#`-joined parts of a value with macros substituted.
fn resolve(chunks: &[Spanned<RawChunk<'_>>], macros: &HashMap<String, String>) -> String {
    let mut value = String::new();
    for chunk in chunks {
        match chunk.v {
            RawChunk::Normal(text) => value.push_str(text),
            RawChunk::Abbreviation(name) => match macros.get(&name.to_ascii_lowercase()) {
                Some(resolved) => value.push_str(resolved),
                None => value.push_str(name),
            },
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_str;

    #[test]
    fn parses_basic_entry() {
        let src = r#"
@InProceedings{lamport78,
  author = {Leslie Lamport},
  Title = "Time, Clocks, and the {O}rdering of Events",
  year = 1978,
}
"#;
        let entries = parse_str(src).unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.entry_type, EntryType::InProceedings);
        assert_eq!(e.key, "lamport78");
        assert_eq!(e.author(), Some("Leslie Lamport"));
        assert_eq!(e.title(), Some("Time, Clocks, and the {O}rdering of Events"));
        assert_eq!(e.year(), Some("1978"));
    }

    #[test]
    fn resolves_string_macros_and_concatenation() {
        let src = r#"
@string{osdi = "Proceedings of OSDI"}
@string{pre = {USENIX }}
@inproceedings{a, booktitle = osdi, publisher = pre # "Association"}
"#;
        let e = &parse_str(src).unwrap()[0];
        assert_eq!(e.get("booktitle"), Some("Proceedings of OSDI"));
        assert_eq!(e.get("publisher"), Some("USENIX Association"));
    }

    #[test]
    fn macros_may_reference_earlier_macros() {
        let src = "@string{usenix = {USENIX}}\n@string{atc = usenix # { ATC}}\n@misc{k, note = atc}";
        assert_eq!(parse_str(src).unwrap()[0].get("note"), Some("USENIX ATC"));
    }

    #[test]
    fn undefined_macro_resolves_to_its_name() {
        let e = &parse_str("@inproceedings{a, booktitle=sosp, month=oct}").unwrap()[0];
        assert_eq!(e.get("booktitle"), Some("sosp"));
        assert_eq!(e.get("month"), Some("oct"));
    }

    #[test]
    fn skips_comments_preamble_and_free_text() {
        let src = r#"
Venue records, sorted by year.
% line comment
@comment{ignore this block}
@preamble{"\newcommand{\x}{y}"}
@misc{k, note={n}}
"#;
        let entries = parse_str(src).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, "k");
    }

    #[test]
    fn collapses_whitespace_in_values() {
        let e = &parse_str("@misc{k, title = {A\n    multi-line   title}}").unwrap()[0];
        assert_eq!(e.title(), Some("A multi-line title"));
    }

    #[test]
    fn spans_cover_entry_text() {
        let src = "x\n@misc{a, title={T}}\n\n@misc{b,\n  note={n}\n}\n";
        let parsed = parse_with_spans(src).unwrap();
        assert_eq!(&src[parsed[0].span.clone()], "@misc{a, title={T}}");
        assert_eq!(&src[parsed[1].span.clone()], "@misc{b,\n  note={n}\n}");
    }

    #[test]
    fn entry_without_fields() {
        let e = &parse_str("@misc{bare,\n}").unwrap()[0];
        assert_eq!(e.key, "bare");
        assert!(e.fields.is_empty());
    }

    #[test]
    fn syntax_error_reports_line() {
        let err = parse_str("@misc{k,\n  title {T}\n}").unwrap_err();
        match err {
            BibError::Syntax { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unterminated_value_is_an_error() {
        assert!(parse_str("@misc{k,\n title = {never {closed\n}").is_err());
    }
}
