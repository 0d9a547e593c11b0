use crate::Entry;

const MONTH_MACROS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Whether `value` is one of the standard three-letter BibTeX month macros.
pub fn is_month_macro(value: &str) -> bool {
    MONTH_MACROS.contains(&value)
}

fn format_value(name: &str, value: &str) -> String {
    if name == "month" && is_month_macro(value) {
        value.to_string()
    } else {
        format!("{{{}}}", value)
    }
}

/// Serialize one entry in the output style: fields in name order,
/// `  name = {value},` with the last comma dropped. The comma after the key
/// is always written, so an entry without fields still reads back.
pub fn write_entry(entry: &Entry) -> String {
    let mut out = format!("@{}{{{},", entry.entry_type, entry.key);
    for (i, (name, value)) in entry.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str("\n  ");
        out.push_str(name);
        out.push_str(" = ");
        out.push_str(&format_value(name, value));
    }
    out.push_str("\n}");
    out
}

/// Serialize a whole bibliography, one blank line between entries.
pub fn write_bibliography(entries: &[Entry]) -> String {
    let mut out = String::new();
    for (i, entry) in entries.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&write_entry(entry));
        out.push('\n');
    }
    out
}

/// Serialize an entry in the compact record-file style (`  name={value},`).
///
/// Fields for which `is_reference(name, value)` holds are written without
/// delimiters so they act as `@string` references.
pub fn write_record_block(entry: &Entry, is_reference: &dyn Fn(&str, &str) -> bool) -> String {
    let mut lines = vec![format!("@{}{{{},", entry.entry_type, entry.key)];
    for (name, value) in &entry.fields {
        let rendered = if is_reference(name, value) {
            value.clone()
        } else {
            format_value(name, value)
        };
        lines.push(format!("  {}={},", name, rendered));
    }
    if lines.len() > 1
        && let Some(last) = lines.last_mut()
        && last.ends_with(',')
    {
        last.pop();
    }
    lines.push("}".to_string());
    lines.join("\n")
}
