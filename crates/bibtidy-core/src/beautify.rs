use bibtidy_bib::Entry;

use crate::citekey::generate_key;
use crate::format::format_title;
use crate::venue::{self, ContainerField, Venue};

/// Container field and value a template prescribes (`booktitle` first).
fn template_container(template: &Entry) -> Option<(ContainerField, &str)> {
    [ContainerField::BookTitle, ContainerField::Journal]
        .into_iter()
        .find_map(|field| template.get(field.as_str()).map(|v| (field, v)))
}

/// Normalize an entry of a known venue.
///
/// With a template, its container field is copied verbatim and the entry type
/// follows it. A template with neither `booktitle` nor `journal` counts as
/// absent; the entry's own container field is then set to the bare venue
/// abbreviation. The title gets its special names protected, `pages` is
/// dropped, a missing year becomes `current_year`, a known venue month
/// replaces the entry's month, and the key is regenerated.
pub fn beautify(entry: &Entry, template: Option<&Entry>, venue: &Venue, current_year: i32) -> Entry {
    let mut out = entry.clone();

    match template.and_then(template_container) {
        Some((field, value)) => {
            out.remove(field.other().as_str());
            out.set(field.as_str(), value);
            out.entry_type = field.entry_type();
        }
        None => {
            let field = venue::detected_field(entry)
                .map(|(field, _)| field)
                .unwrap_or(ContainerField::BookTitle);
            out.set(field.as_str(), venue.abbr);
        }
    }

    if entry.year().is_none() {
        out.set("year", current_year.to_string());
    }
    if let Some(title) = entry.title() {
        out.set("title", format_title(title));
    }
    if let Some(month) = venue.month {
        out.set("month", month);
    }
    out.remove("pages");

    out.key = generate_key(&out);
    out
}
