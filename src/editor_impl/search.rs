// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Incremental reverse history search (Ctrl-R).
//!
//! The sub-mode keeps its own query string and renders an inline prompt of
//! the form `` (reverse-i-search)`QUERY': MATCH `` with the caret sitting on
//! the match inside the displayed entry. Whatever key ends the search is
//! handed back to the main loop and dispatched as if it had just arrived, so
//! Enter submits the adopted line and motion keys edit it.

use crate::editor_impl::editor::{Editor, BS, CTRL_G, CTRL_H, CTRL_R, CTRL_S};
use crate::{Key, LineBuffer, PromptError};

impl Editor<'_> {
    /// Run the reverse-i-search sub-mode. Returns the key that ended the
    /// search (for re-dispatch), or `None` when the search was cancelled
    /// with Ctrl-G.
    pub(crate) async fn reverse_search(&mut self) -> Result<Option<Key>, PromptError> {
        let original = self.buf.clone();
        let mut query = String::new();
        // The empty query matches everything, newest entry first.
        let (mut matches, mut positions) = self.history.by_pattern(&query);
        let mut index = matches.len().saturating_sub(1);
        self.search_refresh(&query, &matches, &positions, index)?;

        loop {
            // The shared select: a resize or control request arriving
            // mid-search is serviced right here, repainting the search
            // display with the current query and match.
            let Some(key) = self
                .next_key(|editor: &mut Self| {
                    editor.search_refresh(&query, &matches, &positions, index)
                })
                .await?
            else {
                return Err(PromptError::Eof);
            };
            match key {
                Key::Rune(CTRL_R) => {
                    if index > 0 {
                        index -= 1;
                    } else {
                        self.beep()?;
                    }
                    self.search_refresh(&query, &matches, &positions, index)?;
                }
                Key::Rune(CTRL_S) => {
                    if index + 1 < matches.len() {
                        index += 1;
                    } else {
                        self.beep()?;
                    }
                    self.search_refresh(&query, &matches, &positions, index)?;
                }
                Key::Rune(CTRL_G) => {
                    self.buf = original;
                    self.refresh()?;
                    return Ok(None);
                }
                Key::Rune(CTRL_H | BS) => {
                    query.pop();
                    (matches, positions) = self.history.by_pattern(&query);
                    index = matches.len().saturating_sub(1);
                    self.search_refresh(&query, &matches, &positions, index)?;
                }
                Key::Rune(r) if !r.is_control() => {
                    query.push(r);
                    let (m, p) = self.history.by_pattern(&query);
                    if m.is_empty() {
                        // Keep the last query that still matched.
                        query.pop();
                        self.beep()?;
                    } else {
                        matches = m;
                        positions = p;
                        index = matches.len() - 1;
                    }
                    self.search_refresh(&query, &matches, &positions, index)?;
                }
                other => {
                    // Adopt the current match, caret on the matched text,
                    // and let the main loop handle the key.
                    if let Some(entry) = matches.get(index) {
                        let caret = entry[..positions[index]].chars().count();
                        let mut line = LineBuffer::from_str(entry);
                        line.set_pos(caret);
                        self.buf = line;
                    } else {
                        self.buf = original;
                    }
                    self.refresh()?;
                    return Ok(Some(other));
                }
            }
        }
    }

    fn search_refresh(
        &mut self,
        query: &str,
        matches: &[String],
        positions: &[usize],
        index: usize,
    ) -> Result<(), PromptError> {
        let shown = matches.get(index).map_or("", String::as_str);
        let prompt: Vec<char> = format!("(reverse-i-search)`{query}': ").chars().collect();
        let mut line = LineBuffer::from_str(shown);
        if let Some(&at) = positions.get(index) {
            line.set_pos(shown[..at].chars().count());
        }
        self.refresh_line(&prompt, &line)
    }
}
