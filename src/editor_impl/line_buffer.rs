// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The in-memory line being edited: a rune vector plus a caret.
//!
//! Caret motion and width math are done in *glyphs* (grapheme clusters), not
//! runes. A glyph here is a base rune followed by zero or more zero-width
//! runes (combining marks, ZWJ). The caret invariant is that it always sits
//! on a glyph boundary, never inside a combining sequence.

use unicode_width::UnicodeWidthChar;

/// True when `c` extends the preceding glyph rather than starting a new one.
#[must_use]
pub fn is_cluster_extender(c: char) -> bool {
    UnicodeWidthChar::width(c) == Some(0)
}

/// Number of glyphs in `runes`.
#[must_use]
pub fn count_glyphs(runes: &[char]) -> usize {
    runes
        .iter()
        .enumerate()
        .filter(|(i, c)| *i == 0 || !is_cluster_extender(**c))
        .count()
}

/// Rune index where glyph `n` starts; `runes.len()` when `n` is past the
/// last glyph.
#[must_use]
pub fn glyph_to_rune_index(runes: &[char], n: usize) -> usize {
    let mut seen = 0;
    for (i, &c) in runes.iter().enumerate() {
        if i == 0 || !is_cluster_extender(c) {
            if seen == n {
                return i;
            }
            seen += 1;
        }
    }
    runes.len()
}

/// The rune slice comprising the first `n` glyphs.
#[must_use]
pub fn prefix_glyphs(runes: &[char], n: usize) -> &[char] {
    &runes[..glyph_to_rune_index(runes, n)]
}

/// The rune slice comprising the last `n` glyphs.
#[must_use]
pub fn suffix_glyphs(runes: &[char], n: usize) -> &[char] {
    let total = count_glyphs(runes);
    &runes[glyph_to_rune_index(runes, total.saturating_sub(n))..]
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    runes: Vec<char>,
    /// Caret, as a rune index in `0..=runes.len()`, always on a glyph
    /// boundary.
    pos: usize,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a buffer from `s` with the caret at the end.
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        let runes: Vec<char> = s.chars().collect();
        let pos = runes.len();
        Self { runes, pos }
    }

    #[must_use]
    pub fn runes(&self) -> &[char] {
        &self.runes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.runes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runes.is_empty()
    }

    #[must_use]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Caret position in glyphs (what the renderer works in).
    #[must_use]
    pub fn glyph_pos(&self) -> usize {
        count_glyphs(&self.runes[..self.pos])
    }

    /// Clamp `pos` into range and snap it down to the nearest glyph boundary.
    pub fn set_pos(&mut self, pos: usize) {
        let mut pos = pos.min(self.runes.len());
        while pos > 0 && pos < self.runes.len() && is_cluster_extender(self.runes[pos]) {
            pos -= 1;
        }
        self.pos = pos;
    }

    pub fn move_home(&mut self) {
        self.pos = 0;
    }

    pub fn move_end(&mut self) {
        self.pos = self.runes.len();
    }

    /// Move the caret `n` glyphs left. Returns false (caller beeps) when the
    /// caret is already at the start.
    pub fn move_left(&mut self, n: usize) -> bool {
        if self.pos == 0 {
            return false;
        }
        let target = self.glyph_pos().saturating_sub(n);
        self.pos = glyph_to_rune_index(&self.runes, target);
        true
    }

    /// Move the caret `n` glyphs right. Returns false when already at the
    /// end.
    pub fn move_right(&mut self, n: usize) -> bool {
        if self.pos == self.runes.len() {
            return false;
        }
        let total = count_glyphs(&self.runes);
        let target = (self.glyph_pos() + n).min(total);
        self.pos = glyph_to_rune_index(&self.runes, target);
        true
    }

    pub fn insert(&mut self, r: char) {
        self.runes.insert(self.pos, r);
        self.pos += 1;
    }

    pub fn insert_many(&mut self, runes: &[char]) {
        self.runes.splice(self.pos..self.pos, runes.iter().copied());
        self.pos += runes.len();
    }

    /// Delete the rune range `[from, to)` and return it (for the kill ring).
    /// The caret is pulled along so it stays on the same logical spot.
    pub fn delete_range(&mut self, from: usize, to: usize) -> Vec<char> {
        let from = from.min(self.runes.len());
        let to = to.min(self.runes.len()).max(from);
        let removed: Vec<char> = self.runes.drain(from..to).collect();
        if self.pos >= to {
            self.pos -= to - from;
        } else if self.pos > from {
            self.pos = from;
        }
        removed
    }

    /// Delete the glyph before the caret (Backspace). None at start of line.
    pub fn delete_glyph_back(&mut self) -> Option<Vec<char>> {
        if self.pos == 0 {
            return None;
        }
        let start = glyph_to_rune_index(&self.runes, self.glyph_pos() - 1);
        Some(self.delete_range(start, self.pos))
    }

    /// Delete the glyph under the caret (Del / Ctrl-D). None at end of line.
    pub fn delete_glyph_at(&mut self) -> Option<Vec<char>> {
        if self.pos == self.runes.len() {
            return None;
        }
        let end = glyph_to_rune_index(&self.runes, self.glyph_pos() + 1);
        Some(self.delete_range(self.pos, end))
    }

    /// Swap the glyph before the caret with the glyph under it and advance
    /// past the pair; at end of line, swap the last two glyphs and leave the
    /// caret in place. Returns false (caller beeps) when there is nothing to
    /// swap.
    pub fn transpose(&mut self) -> bool {
        let total = count_glyphs(&self.runes);
        if total < 2 || self.pos < 1 {
            return false;
        }
        let at_end = self.pos == self.runes.len();
        let (a_idx, b_idx) = if at_end {
            (total - 2, total - 1)
        } else {
            let gp = self.glyph_pos();
            (gp - 1, gp)
        };
        let a_start = glyph_to_rune_index(&self.runes, a_idx);
        let b_start = glyph_to_rune_index(&self.runes, b_idx);
        let b_end = glyph_to_rune_index(&self.runes, b_idx + 1);

        let mut swapped = Vec::with_capacity(b_end - a_start);
        swapped.extend_from_slice(&self.runes[b_start..b_end]);
        swapped.extend_from_slice(&self.runes[a_start..b_start]);
        self.runes.splice(a_start..b_end, swapped);

        self.pos = if at_end { self.runes.len() } else { b_end };
        true
    }

    pub fn clear(&mut self) {
        self.runes.clear();
        self.pos = 0;
    }
}

impl std::fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for r in &self.runes {
            write!(f, "{r}")?;
        }
        Ok(())
    }
}
