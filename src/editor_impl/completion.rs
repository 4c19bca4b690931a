// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Tab completion: the [`Completer`] protocol and the cycling sub-mode.

use crate::editor_impl::editor::{EchoMode, Editor, TAB};
use crate::{Key, LineBuffer, NamedKey, PromptError, ESC};

/// Outcome of a completion query. Concatenating `head + candidate + tail`
/// yields the new line, with the caret placed right after the candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub head: String,
    pub candidates: Vec<String>,
    pub tail: String,
}

/// Supplies completion candidates for the line being edited. `pos` is the
/// caret as a rune index into `line`.
pub trait Completer: Send + Sync {
    fn complete(&self, line: &str, pos: usize) -> Completion;
}

impl<F> Completer for F
where
    F: Fn(&str, usize) -> Completion + Send + Sync,
{
    fn complete(&self, line: &str, pos: usize) -> Completion {
        self(line, pos)
    }
}

/// Adapts the simpler completer shape (a function from the text left of
/// the caret to whole-line replacements) into the [`Completer`] protocol.
///
/// ```
/// use promptline::{Completer, LineCompleter};
///
/// let completer = LineCompleter(|left: &str| {
///     ["hello, world"]
///         .iter()
///         .filter(|c| c.starts_with(left))
///         .map(ToString::to_string)
///         .collect()
/// });
/// let completion = completer.complete("hello!!!", 5);
/// assert_eq!(completion.head, "");
/// assert_eq!(completion.candidates, vec!["hello, world".to_string()]);
/// assert_eq!(completion.tail, "!!!");
/// ```
pub struct LineCompleter<F>(pub F);

impl<F> Completer for LineCompleter<F>
where
    F: Fn(&str) -> Vec<String> + Send + Sync,
{
    fn complete(&self, line: &str, pos: usize) -> Completion {
        let split = line
            .char_indices()
            .nth(pos)
            .map_or(line.len(), |(at, _)| at);
        Completion {
            head: String::new(),
            candidates: (self.0)(&line[..split]),
            tail: line[split..].to_owned(),
        }
    }
}

impl Editor<'_> {
    /// The tab-complete sub-mode.
    ///
    /// Shows `head + candidate + tail` with the caret after the candidate;
    /// Tab / Shift-Tab cycle (wrapping), Esc restores the original line, and
    /// any other key accepts the current candidate and is handed back to the
    /// main loop for normal dispatch. No candidates means no change and no
    /// beep.
    pub(crate) async fn tab_complete(&mut self) -> Result<Option<Key>, PromptError> {
        debug_assert_eq!(self.echo, EchoMode::Normal);
        let Some(completer) = self.completer.clone() else {
            return Ok(None);
        };
        let completion = completer.complete(&self.buf.to_string(), self.buf.pos());
        if completion.candidates.is_empty() {
            return Ok(None);
        }

        let saved = self.buf.clone();
        let head: Vec<char> = completion.head.chars().collect();
        let tail: Vec<char> = completion.tail.chars().collect();
        let count = completion.candidates.len();
        let mut index = 0;
        loop {
            let candidate: Vec<char> = completion.candidates[index].chars().collect();
            let mut preview = Vec::with_capacity(head.len() + candidate.len() + tail.len());
            preview.extend_from_slice(&head);
            preview.extend_from_slice(&candidate);
            let caret = preview.len();
            preview.extend_from_slice(&tail);
            let mut line = LineBuffer::from_str(&preview.iter().collect::<String>());
            line.set_pos(caret);
            self.buf = line;
            self.refresh()?;

            // The shared select: a resize or control request arriving while
            // the menu is open is serviced right here, repainting the
            // preview.
            let Some(key) = self.next_key(Self::refresh).await? else {
                return Err(PromptError::Eof);
            };
            match key {
                Key::Rune(TAB) => index = (index + 1) % count,
                Key::Act(NamedKey::ShiftTab) => index = (index + count - 1) % count,
                Key::Rune(ESC) => {
                    self.buf = saved;
                    self.refresh()?;
                    return Ok(None);
                }
                other => return Ok(Some(other)),
            }
        }
    }
}
