//! Diagnostic line-history context (§5, §9). The upstream checker kept a
//! process-wide mutable history list that was appended to per input line and
//! cleared after each line was handled successfully; here it is an explicit
//! object threaded through the parser instead of `static` state.

use crate::error::LineContext;

/// Accumulates the most recent input lines (and their 1-based line numbers)
/// seen while reading one input source, for attachment to a fatal parse
/// error. Cleared after every line that was handled without error.
#[derive(Clone, Debug, Default)]
pub struct ParseContext {
    history: Vec<String>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the line number and raw text of the line about to be
    /// processed.
    pub fn push_line(&mut self, line_number: usize, line: &str) {
        self.history.push(line_number.to_string());
        self.history.push(line.to_string());
    }

    /// Drops all accumulated history. Called after a line is processed
    /// without error.
    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// A snapshot of the current history, for attaching to a fatal error.
    pub fn snapshot(&self) -> LineContext {
        self.history.clone()
    }
}
