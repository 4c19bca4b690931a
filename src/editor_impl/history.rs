// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::{PromptError, HISTORY_LIMIT, HISTORY_LINE_MAX};
use std::io::{BufRead, Read, Write};

/// How Up/Down recall filters the scrollback against the line typed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    /// Entries beginning with the current line.
    #[default]
    Prefix,
    /// Entries containing the current line anywhere.
    Pattern,
}

/// The scrollback history shared by all prompts of one [`crate::Session`].
///
/// Bounded to [`HISTORY_LIMIT`] entries: appending past capacity drops the
/// oldest entry. Appends of a line equal to the newest entry are no-ops, so
/// no two adjacent entries are ever equal.
///
/// Concurrency is handled by the owner: the store lives behind a
/// `tokio::sync::RwLock` and a prompt holds a read guard for its whole
/// lifetime, so recall indices never go stale mid-edit.
#[derive(Debug)]
pub struct History {
    entries: Vec<String>,
    limit: usize,
    mode: HistoryMode,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            limit: HISTORY_LIMIT,
            mode: HistoryMode::default(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        if self.entries.len() > limit {
            let excess = self.entries.len() - limit;
            self.entries.drain(..excess);
        }
    }

    pub fn set_mode(&mut self, mode: HistoryMode) {
        self.mode = mode;
    }

    #[must_use]
    pub fn mode(&self) -> HistoryMode {
        self.mode
    }

    /// Append an entry. No-op when `item` equals the newest entry; drops the
    /// oldest entry once over capacity.
    pub fn append(&mut self, item: &str) {
        if self.entries.last().is_some_and(|last| last == item) {
            return;
        }
        self.entries.push(item.to_owned());
        if self.entries.len() > self.limit {
            self.entries.remove(0);
        }
    }

    /// Import history from `reader`, one entry per LF-terminated UTF-8 line.
    ///
    /// Returns the number of lines read. EOF is not an error, and a missing
    /// terminator on the final line is accepted. A line longer than
    /// [`HISTORY_LINE_MAX`] bytes or containing invalid UTF-8 aborts the
    /// import at that line; entries read before it are kept.
    ///
    /// # Errors
    ///
    /// [`PromptError::Io`] on read failure, [`PromptError::InvalidHistory`]
    /// (with the 1-based line number) on a malformed line.
    pub fn read_from<R: BufRead>(&mut self, mut reader: R) -> Result<usize, PromptError> {
        let mut num = 0;
        let mut raw: Vec<u8> = Vec::with_capacity(128);
        loop {
            raw.clear();
            let limit = (HISTORY_LINE_MAX + 1) as u64;
            let n = (&mut reader).take(limit).read_until(b'\n', &mut raw)?;
            if n == 0 {
                break;
            }
            let terminated = raw.last() == Some(&b'\n');
            if terminated {
                raw.pop();
                if raw.last() == Some(&b'\r') {
                    raw.pop();
                }
            } else if n > HISTORY_LINE_MAX {
                tracing::warn!(line = num + 1, "history import aborted: line too long");
                return Err(PromptError::InvalidHistory {
                    line: num + 1,
                    reason: "line too long".into(),
                });
            }
            let Ok(line) = String::from_utf8(std::mem::take(&mut raw)) else {
                tracing::warn!(line = num + 1, "history import aborted: invalid utf-8");
                return Err(PromptError::InvalidHistory {
                    line: num + 1,
                    reason: "invalid utf-8".into(),
                });
            };
            num += 1;
            self.entries.push(line);
            if self.entries.len() > self.limit {
                self.entries.remove(0);
            }
        }
        Ok(num)
    }

    /// Export history to `writer`, one entry per line with a trailing LF.
    ///
    /// # Errors
    ///
    /// [`PromptError::Io`] on the first failed write; earlier lines stay
    /// written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<usize, PromptError> {
        let mut num = 0;
        for item in &self.entries {
            writeln!(writer, "{item}")?;
            num += 1;
        }
        Ok(num)
    }

    /// Entries beginning with `line`, oldest first.
    #[must_use]
    pub fn by_prefix(&self, line: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| entry.starts_with(line))
            .cloned()
            .collect()
    }

    /// Entries containing `line`, oldest first, paired with the byte offset
    /// of the first match inside each entry (reverse-i-search places the
    /// caret there).
    #[must_use]
    pub fn by_pattern(&self, line: &str) -> (Vec<String>, Vec<usize>) {
        let mut matches = Vec::new();
        let mut positions = Vec::new();
        for entry in &self.entries {
            if let Some(at) = entry.find(line) {
                matches.push(entry.clone());
                positions.push(at);
            }
        }
        (matches, positions)
    }

    /// The recall filter, honouring the configured [`HistoryMode`].
    #[must_use]
    pub fn lookup(&self, line: &str) -> Vec<String> {
        match self.mode {
            HistoryMode::Prefix => self.by_prefix(line),
            HistoryMode::Pattern => self.by_pattern(line).0,
        }
    }
}
