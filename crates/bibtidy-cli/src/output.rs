use std::io::Write;
use std::path::Path;

use bibtidy_core::{Outcome, ProgressEvent, RunStats};
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

const INDENT: &str = "      ";

fn shorten(title: &str) -> String {
    if title.chars().count() > 60 {
        format!("{}...", title.chars().take(60).collect::<String>())
    } else {
        title.to_string()
    }
}

/// Print what is about to be reconciled.
pub fn print_header(
    w: &mut dyn Write,
    input: &Path,
    entries: usize,
    corpus_dir: &Path,
    corpus_entries: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| input.display().to_string());
    if color.enabled() {
        writeln!(w, "Reconciling {} ({} entries)", name.bold(), entries)?;
    } else {
        writeln!(w, "Reconciling {} ({} entries)", name, entries)?;
    }
    writeln!(
        w,
        "Reference corpus: {} entries from {}",
        corpus_entries,
        corpus_dir.display()
    )?;
    writeln!(w)?;
    Ok(())
}

/// Print a real-time progress event.
pub fn print_progress(
    w: &mut dyn Write,
    event: &ProgressEvent,
    color: ColorMode,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Checking {
            index,
            total,
            key,
            title,
        } => {
            writeln!(
                w,
                "[{}/{}] {}: \"{}\"",
                index + 1,
                total,
                key,
                shorten(title)
            )?;
        }
        ProgressEvent::ExactMatch { matched_key, .. } => {
            if color.enabled() {
                writeln!(w, "{INDENT}found in corpus as {}", matched_key.green())?;
            } else {
                writeln!(w, "{INDENT}found in corpus as {}", matched_key)?;
            }
        }
        ProgressEvent::VenueDetected { venue, .. } => {
            if color.enabled() {
                writeln!(w, "{INDENT}known venue: {}", venue.cyan())?;
            } else {
                writeln!(w, "{INDENT}known venue: {}", venue)?;
            }
        }
        ProgressEvent::Preview { text, .. } => {
            for line in text.lines() {
                if color.enabled() {
                    writeln!(w, "{INDENT}{}", line.dimmed())?;
                } else {
                    writeln!(w, "{INDENT}{}", line)?;
                }
            }
        }
        ProgressEvent::Persisted { path, .. } => {
            if color.enabled() {
                writeln!(w, "{INDENT}{} {}", "added to".green(), path.display())?;
            } else {
                writeln!(w, "{INDENT}added to {}", path.display())?;
            }
        }
        ProgressEvent::PersistDeclined { venue } => {
            writeln!(w, "{INDENT}not added to {}.bib", venue)?;
        }
        ProgressEvent::PersistFailed { venue, message } => {
            if color.enabled() {
                writeln!(
                    w,
                    "{INDENT}{} could not add to {}: {}",
                    "WARNING:".yellow(),
                    venue,
                    message
                )?;
            } else {
                writeln!(w, "{INDENT}WARNING: could not add to {}: {}", venue, message)?;
            }
        }
        ProgressEvent::LookupStarted { service, .. } => {
            writeln!(w, "{INDENT}looking up in {}...", service)?;
        }
        ProgressEvent::LookupRejected {
            service, reason, ..
        } => {
            if color.enabled() {
                writeln!(w, "{INDENT}{}: {}", service, reason.yellow())?;
            } else {
                writeln!(w, "{INDENT}{}: {}", service, reason)?;
            }
        }
        ProgressEvent::Result {
            index,
            total,
            key,
            outcome,
        } => {
            let label = match outcome {
                Outcome::ExactMatch => "MATCHED",
                Outcome::Beautified => "BEAUTIFIED",
                Outcome::Lookup => "LOOKED UP",
                Outcome::Unchanged => "UNCHANGED",
            };
            let label = if !color.enabled() {
                label.to_string()
            } else {
                match outcome {
                    Outcome::ExactMatch => label.green().to_string(),
                    Outcome::Beautified | Outcome::Lookup => label.cyan().to_string(),
                    Outcome::Unchanged => label.dimmed().to_string(),
                }
            };
            writeln!(w, "[{}/{}] -> {} ({})", index + 1, total, label, key)?;
        }
    }
    Ok(())
}

/// Print the end-of-run summary.
pub fn print_summary(
    w: &mut dyn Write,
    stats: &RunStats,
    output: &Path,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", "SUMMARY".bold())?;
    } else {
        writeln!(w, "SUMMARY")?;
    }
    writeln!(w, "  Entries:        {}", stats.total)?;
    writeln!(w, "  Matched:        {}", stats.exact_match)?;
    writeln!(
        w,
        "  Beautified:     {} ({} added to venue files)",
        stats.beautified, stats.persisted
    )?;
    writeln!(w, "  Looked up:      {}", stats.looked_up)?;
    writeln!(w, "  Unchanged:      {}", stats.unchanged)?;
    if stats.merged > 0 {
        writeln!(w, "  Merged:         {}", stats.merged)?;
    }
    writeln!(w)?;
    writeln!(w, "Wrote {} entries to {}", stats.emitted, output.display())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn render(event: ProgressEvent) -> String {
        let mut buf = Vec::new();
        print_progress(&mut buf, &event, ColorMode(false)).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn checking_line_is_numbered_and_shortened() {
        let out = render(ProgressEvent::Checking {
            index: 0,
            total: 3,
            key: "k".into(),
            title: "é".repeat(70),
        });
        assert!(out.starts_with("[1/3] k: \""));
        assert!(out.trim_end().ends_with("...\""));
    }

    #[test]
    fn result_labels() {
        let out = render(ProgressEvent::Result {
            index: 1,
            total: 2,
            key: "renesse15chain".into(),
            outcome: Outcome::Beautified,
        });
        assert_eq!(out, "[2/2] -> BEAUTIFIED (renesse15chain)\n");
    }

    #[test]
    fn colored_result_line_keeps_layout() {
        let mut buf = Vec::new();
        let event = ProgressEvent::Result {
            index: 0,
            total: 1,
            key: "k".into(),
            outcome: Outcome::ExactMatch,
        };
        print_progress(&mut buf, &event, ColorMode(true)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.starts_with("[1/1] -> \u{1b}["));
        assert!(out.contains("MATCHED"));
        assert!(out.ends_with(" (k)\n"));
    }

    #[test]
    fn preview_is_indented_line_by_line() {
        let out = render(ProgressEvent::Preview {
            index: 0,
            venue: "osdi",
            text: "@inproceedings{k,\n  booktitle=osdi\n}".into(),
        });
        assert_eq!(out.lines().count(), 3);
        assert!(out.lines().all(|l| l.starts_with(INDENT)));
    }

    #[test]
    fn summary_mentions_output_path() {
        let mut buf = Vec::new();
        let stats = RunStats {
            total: 3,
            beautified: 1,
            persisted: 1,
            unchanged: 2,
            emitted: 3,
            ..Default::default()
        };
        print_summary(&mut buf, &stats, &PathBuf::from("out.bib"), ColorMode(false)).unwrap();
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("Beautified:     1 (1 added to venue files)"));
        assert!(!out.contains("Merged"));
        assert!(out.ends_with("Wrote 3 entries to out.bib\n"));
    }
}
