// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Word motions and erasures, expressed as pure [`Effect`]s.
//!
//! The controller never touches the terminal or the kill ring; it just
//! inspects a rune slice and a caret and describes what should happen. The
//! editor loop applies the effect.

use std::sync::Arc;

/// Pure description of a word-command outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effect {
    /// Rune range `[from, to)` to delete, if any.
    pub delete: Option<(usize, usize)>,
    /// Caret position after the command.
    pub new_pos: usize,
    /// The command was meaningless where it was invoked.
    pub beep: bool,
}

impl Effect {
    #[must_use]
    pub fn beep_at(pos: usize) -> Self {
        Self {
            new_pos: pos,
            beep: true,
            ..Self::default()
        }
    }
}

/// Pluggable predicate deciding which runes separate words.
pub type SeparatorFn = Arc<dyn Fn(char) -> bool + Send + Sync>;

/// Unicode whitespace (the default separator).
#[must_use]
pub fn space_separator(r: char) -> bool {
    r.is_whitespace()
}

/// Punctuation and symbols: anything that is neither whitespace nor
/// alphanumeric.
#[must_use]
pub fn punct_separator(r: char) -> bool {
    !r.is_whitespace() && !r.is_alphanumeric()
}

/// Disjunction of separator predicates.
///
/// ```
/// use promptline::{combine_separators, punct_separator, space_separator};
/// use std::sync::Arc;
///
/// let sep = combine_separators(vec![Arc::new(space_separator), Arc::new(punct_separator)]);
/// assert!(sep(' '));
/// assert!(sep('('));
/// assert!(!sep('a'));
/// ```
#[must_use]
pub fn combine_separators(checkers: Vec<SeparatorFn>) -> SeparatorFn {
    Arc::new(move |r| checkers.iter().any(|is_separator| is_separator(r)))
}

/// Word-related commands: Ctrl-W, Alt-D, Alt-B / Ctrl-Left, Alt-F /
/// Ctrl-Right. All four are pure; positions are rune indices.
pub trait WordController: Send + Sync {
    /// Effect for Ctrl-W: erase the word ending at the caret.
    fn erase_word_back(&self, line: &[char], pos: usize) -> Effect;
    /// Effect for Alt-D: delete the word starting at/after the caret.
    fn delete_next_word(&self, line: &[char], pos: usize) -> Effect;
    /// Effect for Alt-B: move to the start of the previous word.
    fn word_left(&self, line: &[char], pos: usize) -> Effect;
    /// Effect for Alt-F: move past the end of the current word.
    fn word_right(&self, line: &[char], pos: usize) -> Effect;
}

/// Default behaviour: words are separated by Unicode whitespace.
#[derive(Clone)]
pub struct DefaultWordController {
    separator: SeparatorFn,
}

impl Default for DefaultWordController {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultWordController {
    #[must_use]
    pub fn new() -> Self {
        Self {
            separator: Arc::new(space_separator),
        }
    }

    pub fn set_separator(&mut self, separator: SeparatorFn) {
        self.separator = separator;
    }

    fn is_separator(&self, r: char) -> bool {
        (self.separator)(r)
    }
}

impl WordController for DefaultWordController {
    fn erase_word_back(&self, line: &[char], pos: usize) -> Effect {
        erase_word_back_with(line, pos, |r| self.is_separator(r))
    }

    fn delete_next_word(&self, line: &[char], pos: usize) -> Effect {
        if pos == line.len() {
            return Effect::beep_at(pos);
        }
        let mut end = pos;
        // Skip separators to the right, then the word itself.
        while end < line.len() && self.is_separator(line[end]) {
            end += 1;
        }
        while end < line.len() && !self.is_separator(line[end]) {
            end += 1;
        }
        Effect {
            delete: Some((pos, end)),
            new_pos: pos,
            beep: false,
        }
    }

    fn word_left(&self, line: &[char], pos: usize) -> Effect {
        if pos == 0 {
            return Effect::beep_at(pos);
        }
        let mut pos = pos;
        loop {
            pos -= 1;
            if pos == 0 {
                break;
            }
            // Stop on a word rune whose left neighbour is a separator.
            let at_separator = self.is_separator(line[pos]);
            let separator_left = self.is_separator(line[pos - 1]);
            if !at_separator && separator_left {
                break;
            }
        }
        Effect {
            new_pos: pos,
            ..Effect::default()
        }
    }

    fn word_right(&self, line: &[char], pos: usize) -> Effect {
        if pos >= line.len() {
            return Effect::beep_at(pos);
        }
        let mut pos = pos;
        loop {
            pos += 1;
            if pos == line.len() {
                break;
            }
            // Stop on a separator whose left neighbour is a word rune.
            let at_separator = self.is_separator(line[pos]);
            let separator_left = self.is_separator(line[pos - 1]);
            if at_separator && !separator_left {
                break;
            }
        }
        Effect {
            new_pos: pos,
            ..Effect::default()
        }
    }
}

/// Bash-like behaviour: motion treats whitespace *and* punctuation as
/// separators, but Ctrl-W still erases back to whitespace only (so
/// `rm -rf` is one Ctrl-W word, while Alt-B stops at the `-`).
#[derive(Clone)]
pub struct BashWordController {
    inner: DefaultWordController,
}

impl Default for BashWordController {
    fn default() -> Self {
        Self::new()
    }
}

impl BashWordController {
    #[must_use]
    pub fn new() -> Self {
        let mut inner = DefaultWordController::new();
        inner.set_separator(combine_separators(vec![
            Arc::new(space_separator),
            Arc::new(punct_separator),
        ]));
        Self { inner }
    }
}

impl WordController for BashWordController {
    fn erase_word_back(&self, line: &[char], pos: usize) -> Effect {
        erase_word_back_with(line, pos, space_separator)
    }

    fn delete_next_word(&self, line: &[char], pos: usize) -> Effect {
        self.inner.delete_next_word(line, pos)
    }

    fn word_left(&self, line: &[char], pos: usize) -> Effect {
        self.inner.word_left(line, pos)
    }

    fn word_right(&self, line: &[char], pos: usize) -> Effect {
        self.inner.word_right(line, pos)
    }
}

fn erase_word_back_with(
    line: &[char],
    original_pos: usize,
    is_separator: impl Fn(char) -> bool,
) -> Effect {
    if original_pos == 0 {
        return Effect::beep_at(original_pos);
    }
    let mut pos = original_pos;
    // Skip separators to the left, then the word itself.
    while pos > 0 && is_separator(line[pos - 1]) {
        pos -= 1;
    }
    while pos > 0 && !is_separator(line[pos - 1]) {
        pos -= 1;
    }
    Effect {
        delete: Some((pos, original_pos)),
        new_pos: pos,
        beep: false,
    }
}
