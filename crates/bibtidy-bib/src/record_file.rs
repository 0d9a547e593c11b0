use crate::parser::parse_with_spans;
use crate::{BibError, Entry};

#[derive(Debug, Clone)]
enum Block {
    /// Anything between entries: whitespace, comments, `@string` definitions.
    Text(String),
    Entry { text: String, entry: Entry },
}

/// A BibTeX file viewed as an ordered sequence of blocks.
///
/// Every block keeps its exact source text, so rendering a file that was only
/// inserted into reproduces all untouched entries byte-for-byte.
#[derive(Debug, Clone)]
pub struct RecordFile {
    blocks: Vec<Block>,
}

impl RecordFile {
    pub fn parse(source: &str) -> Result<Self, BibError> {
        let mut blocks = Vec::new();
        let mut cursor = 0;
        for parsed in parse_with_spans(source)? {
            if parsed.span.start > cursor {
                blocks.push(Block::Text(source[cursor..parsed.span.start].to_string()));
            }
            blocks.push(Block::Entry {
                text: source[parsed.span.clone()].to_string(),
                entry: parsed.entry,
            });
            cursor = parsed.span.end;
        }
        if cursor < source.len() {
            blocks.push(Block::Text(source[cursor..].to_string()));
        }
        Ok(Self { blocks })
    }

    /// Entries in file order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Entry { entry, .. } => Some(entry),
            Block::Text(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert `text` (the serialized form of `entry`) right before the
    /// `index`-th entry. An index past the last entry appends.
    pub fn insert_before(&mut self, index: usize, entry: Entry, text: String) {
        let position = self
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| matches!(b, Block::Entry { .. }))
            .nth(index)
            .map(|(i, _)| i);

        match position {
            Some(i) => {
                self.blocks.insert(i, Block::Text("\n\n".to_string()));
                self.blocks.insert(i, Block::Entry { text, entry });
            }
            None => self.push(entry, text),
        }
    }

    /// Append `text` at the end of the file, separated by a blank line.
    pub fn push(&mut self, entry: Entry, text: String) {
        let rendered = self.render();
        if !rendered.is_empty() {
            let separator = if rendered.ends_with("\n\n") {
                ""
            } else if rendered.ends_with('\n') {
                "\n"
            } else {
                "\n\n"
            };
            if !separator.is_empty() {
                self.blocks.push(Block::Text(separator.to_string()));
            }
        }
        self.blocks.push(Block::Entry { text, entry });
        self.blocks.push(Block::Text("\n".to_string()));
    }

    /// Reassemble the file text.
    pub fn render(&self) -> String {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Text(text) | Block::Entry { text, .. } => text.as_str(),
            })
            .collect()
    }
}
