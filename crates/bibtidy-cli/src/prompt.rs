use std::io::{BufRead, Write};

use bibtidy_core::Confirm;
use bibtidy_core::config_file::PromptMode;

/// Asks on a terminal-style stream and reads a `y`/`yes` answer. Anything
/// else, including end of input, is a no.
pub struct LineConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> LineConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for LineConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> bool {
        if write!(self.output, "{} [y/N] ", question)
            .and_then(|_| self.output.flush())
            .is_err()
        {
            return false;
        }
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        }
    }
}

/// The confirmer for a prompt mode: stdin/stdout for `ask`, a fixed answer
/// otherwise.
pub fn confirmer(mode: PromptMode) -> Box<dyn Confirm> {
    match mode {
        PromptMode::Ask => Box::new(LineConfirm::new(std::io::stdin().lock(), std::io::stdout())),
        PromptMode::Yes => Box::new(|_: &str| true),
        PromptMode::No => Box::new(|_: &str| false),
    }
}
