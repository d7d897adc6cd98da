//! # Tokenizer
//!
//! Splits one input line into whitespace-separated tokens. Tokens are kept as
//! byte ranges into the borrowed line, so the line itself is never modified.

use crate::error::MonitorError;
use alloc::vec::Vec;
use core::ops::Range;

/// Maximum number of tokens (command name included) on one line.
pub const MAX_ARGS: usize = 16;

/// Space, tab, carriage return and newline.
#[inline]
const fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// The tokens of one command line. The first token is the command name.
#[derive(Clone, Debug)]
pub struct Args<'l> {
    line: &'l str,
    spans: Vec<Range<usize>>,
}

impl<'l> Args<'l> {
    /// Split `line` into at most `max` tokens.
    ///
    /// Runs of whitespace collapse into one separator; leading and trailing
    /// whitespace is ignored. An empty or all-blank line yields no tokens.
    ///
    /// # Errors
    /// [`MonitorError::TooManyArguments`] if the line holds more than `max` tokens.
    pub fn tokenize(line: &'l str, max: usize) -> Result<Self, MonitorError> {
        let bytes = line.as_bytes();
        let mut spans = Vec::new();
        let mut i = 0;

        loop {
            while i < bytes.len() && is_whitespace(bytes[i]) {
                i += 1;
            }
            if i == bytes.len() {
                break;
            }

            if spans.len() == max {
                return Err(MonitorError::TooManyArguments { max });
            }

            let start = i;
            while i < bytes.len() && !is_whitespace(bytes[i]) {
                i += 1;
            }
            spans.push(start..i);
        }

        Ok(Self { line, spans })
    }

    /// Number of tokens, command name included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The `i`-th token.
    #[inline]
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&'l str> {
        // Separators are ASCII, so every span starts and ends on a char boundary.
        self.spans.get(i).map(|span| &self.line[span.clone()])
    }

    /// The command name, if the line was not blank.
    #[inline]
    #[must_use]
    pub fn command(&self) -> Option<&'l str> {
        self.get(0)
    }

    /// Iterate over all tokens in order.
    pub fn iter(&self) -> impl Iterator<Item = &'l str> + '_ {
        let line = self.line;
        self.spans.iter().map(move |span| &line[span.clone()])
    }
}
