// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The bounded set of ANSI sequences the editor ever emits.
//!
//! Everything is drawn on one physical row, so cursor control reduces to
//! "go to column n" plus erase-to-end-of-line and erase-screen. The column
//! move is `ESC [ n G` (CHA) when [`TermCaps::use_cha`] is set, otherwise a
//! carriage return followed by `ESC [ n C` (CUF).

use crate::TermCaps;
use std::io::{self, Write};

/// Move the cursor to the 0-based column `col` on the current row.
pub fn cursor_to_column(out: &mut dyn Write, caps: TermCaps, col: usize) -> io::Result<()> {
    if caps.use_cha {
        // CHA is 1-based.
        write!(out, "\x1b[{}G", col + 1)
    } else {
        out.write_all(b"\r")?;
        if col > 0 {
            write!(out, "\x1b[{col}C")?;
        }
        Ok(())
    }
}

/// Erase from the cursor to the end of the current row.
pub fn erase_to_end_of_line(out: &mut dyn Write) -> io::Result<()> {
    out.write_all(b"\x1b[0K")
}

/// Clear the whole screen and home the cursor.
pub fn erase_screen(out: &mut dyn Write) -> io::Result<()> {
    out.write_all(b"\x1b[H\x1b[2J")
}

/// Move to the start of the next row. Raw mode disables output
/// post-processing, so the carriage return must be explicit.
pub fn newline(out: &mut dyn Write) -> io::Result<()> {
    out.write_all(b"\r\n")
}

/// The only UI for meaningless input (backspace at column 0 and friends).
pub fn beep(out: &mut dyn Write) -> io::Result<()> {
    out.write_all(b"\x07")
}
