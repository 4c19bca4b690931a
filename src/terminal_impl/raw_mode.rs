// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use std::io;

/// A representation of a terminal input mode that can be (re-)applied.
///
/// Embedders that run subprocesses between prompts use this to juggle modes:
/// capture with [`terminal_mode`], hand the terminal to the child, then
/// `apply_mode` to get back to where the session left things.
pub trait ModeApplier {
    /// Put the terminal into this mode.
    ///
    /// # Errors
    ///
    /// Returns an error when the mode cannot be applied (for example when
    /// the output is not a terminal).
    fn apply_mode(&self) -> io::Result<()>;
}

/// The mode the terminal was in before raw mode was first enabled.
/// crossterm captures the exact termios on the first
/// [`crossterm::terminal::enable_raw_mode`] call and restores it on
/// [`crossterm::terminal::disable_raw_mode`].
#[derive(Debug, Clone, Copy)]
pub struct CookedMode;

impl ModeApplier for CookedMode {
    fn apply_mode(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

/// Raw mode: echo, canonical processing and most signal generation off, so
/// the program sees one keystroke at a time.
#[derive(Debug, Clone, Copy)]
pub struct RawMode;

impl ModeApplier for RawMode {
    fn apply_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }
}

/// The mode to restore after this process is done with the terminal.
#[must_use]
pub fn terminal_mode() -> impl ModeApplier {
    CookedMode
}

/// Scoped raw-mode acquisition.
///
/// Wrapping enter/leave in a guard means every exit path out of a prompt
/// (return, error, panic, cancellation) puts the terminal back exactly the
/// way it was found.
#[derive(Debug)]
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    /// Enter raw mode. Idempotent: entering while already raw keeps the
    /// originally captured mode.
    pub fn enter() -> io::Result<Self> {
        RawMode.apply_mode()?;
        tracing::debug!("raw mode acquired");
        Ok(Self { active: true })
    }

    /// Restore the captured mode. Safe to call more than once.
    pub fn leave(&mut self) -> io::Result<()> {
        if self.active {
            self.active = false;
            CookedMode.apply_mode()?;
            tracing::debug!("raw mode released");
        }
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            let _ = CookedMode.apply_mode();
            tracing::debug!("raw mode released on drop");
        }
    }
}

/// Current terminal width in columns; `0` when the output is not a terminal.
#[must_use]
pub fn columns() -> usize {
    crossterm::terminal::size().map_or(0, |(cols, _rows)| usize::from(cols))
}
