// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Draws the prompt and the visible part of the line onto one physical row.
//!
//! Keeping everything on a single row is what makes resize and scroll-back
//! behaviour trivial to reason about: the caret is always visible, and a
//! redraw never depends on what the terminal did to previous rows. When the
//! line does not fit, a window centred on the caret is shown, with `{` / `}`
//! marking clipped text on either side.
//!
//! All arithmetic is in glyphs (grapheme clusters), so combining marks never
//! skew the caret column.

use crate::editor_impl::line_buffer::{count_glyphs, glyph_to_rune_index};
use crate::terminal_impl::ansi;
use crate::TermCaps;
use std::io::{self, Write};

/// Redraw the row: prompt, visible slice of `buf`, erase-to-end-of-line,
/// caret placed at the glyph index `pos` points into. Output depends only on
/// the arguments, so repeating a refresh repeats the same bytes.
pub fn refresh(
    out: &mut dyn Write,
    caps: TermCaps,
    prompt: &[char],
    buf: &[char],
    pos: usize,
    cols: usize,
) -> io::Result<()> {
    ansi::cursor_to_column(out, caps, 0)?;
    write_runes(out, prompt)?;

    let p_len = count_glyphs(prompt);
    let b_len = count_glyphs(buf);
    let cp = count_glyphs(&buf[..pos.min(buf.len())]);

    if p_len + b_len < cols {
        write_runes(out, buf)?;
        ansi::erase_to_end_of_line(out)?;
        ansi::cursor_to_column(out, caps, p_len + cp)?;
        return out.flush();
    }

    // One cell is reserved for the cursor itself.
    let space = cols.saturating_sub(p_len + 1);
    if space == 0 {
        // Prompt alone fills the row; nothing useful to show.
        ansi::erase_to_end_of_line(out)?;
        return out.flush();
    }

    // Centre the caret in the available space, clamped to the line.
    let mut start = cp as isize - (space / 2) as isize;
    let mut end = start + space as isize;
    if end > b_len as isize {
        end = b_len as isize;
        start = end - space as isize;
    }
    if start < 0 {
        start = 0;
        end = space as isize;
    }
    #[allow(clippy::cast_sign_loss)]
    let (mut start, mut end) = (start as usize, end as usize);

    // Caret column within the window, before marker adjustment: a marker
    // occupies the column of the glyph it replaces.
    let caret = cp - start;
    let clipped_left = start > 0;
    let clipped_right = end < b_len;
    if clipped_left {
        start += 1;
    }
    if clipped_right {
        end -= 1;
    }

    let window = &buf[glyph_to_rune_index(buf, start)..glyph_to_rune_index(buf, end)];
    if clipped_left {
        out.write_all(b"{")?;
    }
    write_runes(out, window)?;
    if clipped_right {
        out.write_all(b"}")?;
    }
    ansi::erase_to_end_of_line(out)?;
    ansi::cursor_to_column(out, caps, p_len + caret)?;
    out.flush()
}

/// Password variant: the prompt is drawn, the buffer never is.
pub fn refresh_password(out: &mut dyn Write, caps: TermCaps, prompt: &[char]) -> io::Result<()> {
    ansi::cursor_to_column(out, caps, 0)?;
    write_runes(out, prompt)?;
    ansi::erase_to_end_of_line(out)?;
    ansi::cursor_to_column(out, caps, count_glyphs(prompt))?;
    out.flush()
}

fn write_runes(out: &mut dyn Write, runes: &[char]) -> io::Result<()> {
    let mut utf8 = [0u8; 4];
    for &r in runes {
        out.write_all(r.encode_utf8(&mut utf8).as_bytes())?;
    }
    Ok(())
}
