// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The editor loop: the state machine that binds the decoder, line buffer,
//! renderer, history, kill ring, word controller and the two sub-modes
//! (tab completion, reverse-i-search) together.
//!
//! One [`Editor`] exists per live prompt. It blocks in exactly one place:
//! the `select!` over key events, resize notifications, and out-of-band
//! control requests, factored into [`Editor::next_key`] so that the main
//! loop and both sub-modes share it. A resize or control request is
//! therefore serviced between two input events even while the user sits in
//! tab completion or reverse-i-search. Every command handler is synchronous
//! and finite. The long-lived pieces (history, kill ring, channels) are
//! owned by [`crate::Session`] and borrowed for the duration of the call.

use crate::editor_impl::renderer;
use crate::terminal_impl::ansi;
use crate::{
    Completer, ControlOp, Effect, History, Key, KillMode, KillRing, LineBuffer, NamedKey,
    PromptControl, SafeRawTerminal, TermCaps, WordController, ESC,
};
use std::io::{self, Write as _};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, OwnedRwLockReadGuard};

/// Error returned from [`crate::Session::prompt`] and friends.
#[derive(Debug, Error)]
pub enum PromptError {
    /// Ctrl-D on an empty line, or the terminal input closed.
    #[error("end of input")]
    Eof,

    /// The user pressed Ctrl-C.
    #[error("prompt aborted")]
    Aborted,

    /// A terminal read or write failed.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Standard output is not attached to a terminal.
    #[error("standard output is not a terminal")]
    NotATerminal,

    /// `TERM` names a terminal that cannot do line editing.
    #[error("terminal is not supported")]
    Unsupported,

    /// A history import hit a malformed line; entries before it were kept.
    #[error("invalid history at line {line}: {reason}")]
    InvalidHistory { line: usize, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EchoMode {
    Normal,
    /// Echo-suppressed, restricted command set.
    Password,
}

/// How a finished prompt left the loop.
pub(crate) enum Outcome {
    Submit(String),
    Eof,
    Aborted,
}

impl Outcome {
    fn into_result(self) -> Result<String, PromptError> {
        match self {
            Outcome::Submit(line) => Ok(line),
            Outcome::Eof => Err(PromptError::Eof),
            Outcome::Aborted => Err(PromptError::Aborted),
        }
    }
}

/// Span of the text inserted by the last yank, so Alt-Y can replace it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct YankState {
    pub(crate) start: usize,
    pub(crate) len: usize,
}

pub(crate) const CTRL_A: char = '\x01';
pub(crate) const CTRL_B: char = '\x02';
pub(crate) const CTRL_C: char = '\x03';
pub(crate) const CTRL_D: char = '\x04';
pub(crate) const CTRL_E: char = '\x05';
pub(crate) const CTRL_F: char = '\x06';
pub(crate) const CTRL_G: char = '\x07';
pub(crate) const CTRL_H: char = '\x08';
pub(crate) const TAB: char = '\x09';
pub(crate) const LF: char = '\x0a';
pub(crate) const CTRL_K: char = '\x0b';
pub(crate) const CTRL_L: char = '\x0c';
pub(crate) const CR: char = '\x0d';
pub(crate) const CTRL_N: char = '\x0e';
pub(crate) const CTRL_P: char = '\x10';
pub(crate) const CTRL_R: char = '\x12';
pub(crate) const CTRL_S: char = '\x13';
pub(crate) const CTRL_T: char = '\x14';
pub(crate) const CTRL_U: char = '\x15';
pub(crate) const CTRL_W: char = '\x17';
pub(crate) const CTRL_Y: char = '\x19';
pub(crate) const BS: char = '\x7f';

/// State for one live prompt.
pub(crate) struct Editor<'a> {
    pub(crate) prompt: Vec<char>,
    pub(crate) buf: LineBuffer,
    pub(crate) caps: TermCaps,
    pub(crate) cols: usize,
    /// Re-queried on resize; injectable so tests control the width.
    pub(crate) cols_source: Arc<dyn Fn() -> usize + Send + Sync>,
    pub(crate) out: SafeRawTerminal,
    /// Read guard held for the whole prompt: recall indices stay valid
    /// because nobody can mutate the store mid-edit.
    pub(crate) history: OwnedRwLockReadGuard<History>,
    pub(crate) kill_ring: &'a mut KillRing,
    pub(crate) completer: Option<Arc<dyn Completer>>,
    pub(crate) words: Arc<dyn WordController>,
    pub(crate) keys: &'a mut mpsc::Receiver<io::Result<Key>>,
    pub(crate) resize: &'a mut mpsc::Receiver<()>,
    pub(crate) control: &'a mut mpsc::Receiver<PromptControl>,
    /// Cleared when the corresponding channel closes, disabling that select
    /// arm instead of spinning on `None`.
    pub(crate) resize_open: bool,
    pub(crate) control_open: bool,
    pub(crate) echo: EchoMode,

    // Editing state.
    pub(crate) hidden: bool,
    /// Kill-chain counter: 2 right after a kill command, decremented by
    /// every command. A kill that observes it > 0 coalesces into the
    /// current ring entry instead of starting a new one.
    pub(crate) kill_chain: u8,
    pub(crate) yank: Option<YankState>,
    /// Filtered snapshot the Up/Down cursor walks over.
    pub(crate) history_view: Vec<String>,
    pub(crate) history_pos: usize,
    /// The in-progress line saved on first Up, restored when the user walks
    /// back past the newest entry.
    pub(crate) history_end: String,
    /// True when the previous command was a history move; while it stays
    /// true the filter is not recomputed, so typing narrows the recall set.
    pub(crate) history_action: bool,
}

impl Editor<'_> {
    pub(crate) async fn run(&mut self) -> Result<String, PromptError> {
        self.refresh()?;
        loop {
            let Some(key) = self.next_key(Self::refresh).await? else {
                self.newline()?;
                return Err(PromptError::Eof);
            };
            if let Some(outcome) = self.dispatch(key).await? {
                return outcome.into_result();
            }
        }
    }

    /// Wait for the next key. This is the editor's only suspension point:
    /// the main loop and both sub-modes draw their keys through it, so a
    /// resize or an out-of-band control request is serviced atomically
    /// between two input events no matter which mode is active. `redraw`
    /// repaints whichever view is on screen after a serviced event.
    ///
    /// Returns `None` once the terminal input has closed.
    pub(crate) async fn next_key<F>(&mut self, mut redraw: F) -> Result<Option<Key>, PromptError>
    where
        F: FnMut(&mut Self) -> Result<(), PromptError>,
    {
        loop {
            tokio::select! {
                maybe_key = self.keys.recv() => match maybe_key {
                    Some(Ok(key)) => return Ok(Some(key)),
                    Some(Err(err)) => return Err(err.into()),
                    None => return Ok(None),
                },
                maybe_resize = self.resize.recv(), if self.resize_open => match maybe_resize {
                    Some(()) => {
                        self.cols = (self.cols_source)();
                        redraw(self)?;
                    }
                    None => self.resize_open = false,
                },
                maybe_control = self.control.recv(), if self.control_open => match maybe_control {
                    Some(control) => self.apply_control(control, &mut redraw)?,
                    None => self.control_open = false,
                },
            }
        }
    }

    /// Route one key: sub-mode entries first, then the command table. A
    /// sub-mode may hand back the key that ended it, which is then treated
    /// as if it had just arrived.
    pub(crate) async fn dispatch(&mut self, key: Key) -> Result<Option<Outcome>, PromptError> {
        let mut key = key;
        loop {
            if self.echo == EchoMode::Normal {
                if key == Key::Rune(TAB) && self.at_completion_point() {
                    match self.tab_complete().await? {
                        Some(next) => {
                            key = next;
                            continue;
                        }
                        None => {
                            self.finish_command(false, false, false);
                            return Ok(None);
                        }
                    }
                }
                if key == Key::Rune(CTRL_R) {
                    match self.reverse_search().await? {
                        Some(next) => {
                            key = next;
                            continue;
                        }
                        None => {
                            self.finish_command(false, false, false);
                            return Ok(None);
                        }
                    }
                }
            }
            return self.dispatch_command(key);
        }
    }

    fn dispatch_command(&mut self, key: Key) -> Result<Option<Outcome>, PromptError> {
        if self.echo == EchoMode::Password {
            return self.dispatch_password(key);
        }

        let mut kill_cmd = false;
        let mut history_cmd = false;
        let mut yank_cmd = false;

        match key {
            // Resize notifications from the channel are serviced inside
            // `next_key`; this arm handles a decoder that surfaces resize
            // through the key stream (console input records do).
            Key::Resize => {
                self.cols = (self.cols_source)();
                self.refresh()?;
            }
            Key::Rune(CR | LF) => {
                self.newline()?;
                return Ok(Some(Outcome::Submit(self.buf.to_string())));
            }
            Key::Rune(CTRL_C) => {
                self.buf.clear();
                self.refresh()?;
                self.newline()?;
                return Ok(Some(Outcome::Aborted));
            }
            Key::Rune(CTRL_A) => {
                self.buf.move_home();
                self.refresh()?;
            }
            Key::Rune(CTRL_E) => {
                self.buf.move_end();
                self.refresh()?;
            }
            Key::Rune(CTRL_B) | Key::Act(NamedKey::Left) => {
                if self.buf.move_left(1) {
                    self.refresh()?;
                } else {
                    self.beep()?;
                }
            }
            Key::Rune(CTRL_F) | Key::Act(NamedKey::Right) => {
                if self.buf.move_right(1) {
                    self.refresh()?;
                } else {
                    self.beep()?;
                }
            }
            Key::Rune(CTRL_D) => {
                if self.buf.is_empty() {
                    self.newline()?;
                    return Ok(Some(Outcome::Eof));
                }
                if self.buf.delete_glyph_at().is_some() {
                    self.refresh()?;
                } else {
                    self.beep()?;
                }
            }
            Key::Act(NamedKey::Delete) => {
                if self.buf.delete_glyph_at().is_some() {
                    self.refresh()?;
                } else {
                    self.beep()?;
                }
            }
            Key::Rune(CTRL_K) => {
                if self.buf.pos() == self.buf.len() {
                    self.beep()?;
                } else {
                    let killed = self.buf.delete_range(self.buf.pos(), self.buf.len());
                    self.kill_ring.kill(&killed, self.kill_mode(KillMode::Append));
                    kill_cmd = true;
                    self.refresh()?;
                }
            }
            Key::Rune(CTRL_U) => {
                if self.buf.pos() == 0 {
                    self.beep()?;
                } else {
                    let killed = self.buf.delete_range(0, self.buf.pos());
                    self.kill_ring.kill(&killed, self.kill_mode(KillMode::Prepend));
                    kill_cmd = true;
                    self.refresh()?;
                }
            }
            Key::Rune(CTRL_W) | Key::Act(NamedKey::AltBackspace) => {
                let effect = self.words.erase_word_back(self.buf.runes(), self.buf.pos());
                kill_cmd = self.apply_kill_effect(effect, KillMode::Prepend)?;
            }
            Key::Act(NamedKey::AltD) => {
                let effect = self.words.delete_next_word(self.buf.runes(), self.buf.pos());
                kill_cmd = self.apply_kill_effect(effect, KillMode::Append)?;
            }
            Key::Act(NamedKey::AltB | NamedKey::WordLeft) => {
                let effect = self.words.word_left(self.buf.runes(), self.buf.pos());
                self.apply_motion_effect(effect)?;
            }
            Key::Act(NamedKey::AltF | NamedKey::WordRight) => {
                let effect = self.words.word_right(self.buf.runes(), self.buf.pos());
                self.apply_motion_effect(effect)?;
            }
            Key::Rune(CTRL_Y) => match self.kill_ring.current() {
                Some(text) => {
                    let text = text.to_vec();
                    let start = self.buf.pos();
                    self.buf.insert_many(&text);
                    self.yank = Some(YankState {
                        start,
                        len: text.len(),
                    });
                    yank_cmd = true;
                    self.refresh()?;
                }
                None => self.beep()?,
            },
            Key::Act(NamedKey::AltY) => match self.yank {
                Some(YankState { start, len }) => {
                    self.kill_ring.rotate();
                    let text = self
                        .kill_ring
                        .current()
                        .map(<[char]>::to_vec)
                        .unwrap_or_default();
                    self.buf.delete_range(start, start + len);
                    self.buf.insert_many(&text);
                    self.yank = Some(YankState {
                        start,
                        len: text.len(),
                    });
                    yank_cmd = true;
                    self.refresh()?;
                }
                None => self.beep()?,
            },
            Key::Rune(CTRL_T) => {
                if self.buf.transpose() {
                    self.refresh()?;
                } else {
                    self.beep()?;
                }
            }
            Key::Rune(CTRL_L) => {
                {
                    let mut out = self.out.lock().unwrap();
                    ansi::erase_screen(&mut *out)?;
                }
                self.refresh()?;
            }
            Key::Rune(CTRL_H | BS) => {
                if self.buf.delete_glyph_back().is_some() {
                    self.refresh()?;
                } else {
                    self.beep()?;
                }
            }
            Key::Rune(CTRL_P) | Key::Act(NamedKey::Up) => {
                history_cmd = true;
                self.history_up()?;
            }
            Key::Rune(CTRL_N) | Key::Act(NamedKey::Down) => {
                history_cmd = true;
                self.history_down()?;
            }
            Key::Act(NamedKey::Home) => {
                self.buf.move_home();
                self.refresh()?;
            }
            Key::Act(NamedKey::End) => {
                self.buf.move_end();
                self.refresh()?;
            }
            // A standalone escape keypress does nothing.
            Key::Rune(ESC) => {}
            // Every other control code is meaningless here.
            Key::Rune(r) if r.is_control() => self.beep()?,
            Key::Rune(r) => self.insert_rune(r)?,
            // F-keys, Insert, PageUp/Down, ShiftTab, Unknown.
            Key::Act(_) => {}
        }

        self.finish_command(kill_cmd, history_cmd, yank_cmd);
        Ok(None)
    }

    /// Echo-suppressed dispatch: submit, abort, EOF, erase, clear screen,
    /// and blind insertion only.
    fn dispatch_password(&mut self, key: Key) -> Result<Option<Outcome>, PromptError> {
        match key {
            Key::Resize => {
                self.cols = (self.cols_source)();
                self.refresh()?;
            }
            Key::Rune(CR | LF) => {
                self.newline()?;
                return Ok(Some(Outcome::Submit(self.buf.to_string())));
            }
            Key::Rune(CTRL_C) => {
                self.buf.clear();
                self.refresh()?;
                self.newline()?;
                return Ok(Some(Outcome::Aborted));
            }
            Key::Rune(CTRL_D) => {
                if self.buf.is_empty() {
                    self.newline()?;
                    return Ok(Some(Outcome::Eof));
                }
                if self.buf.delete_glyph_at().is_none() {
                    self.beep()?;
                }
            }
            Key::Rune(CTRL_L) => {
                {
                    let mut out = self.out.lock().unwrap();
                    ansi::erase_screen(&mut *out)?;
                }
                self.refresh()?;
            }
            Key::Rune(CTRL_H | BS) => {
                if self.buf.delete_glyph_back().is_none() {
                    self.beep()?;
                }
            }
            Key::Rune(r) if r.is_control() => self.beep()?,
            Key::Rune(r) => self.buf.insert(r),
            Key::Act(_) => self.beep()?,
        }
        Ok(None)
    }

    /// Apply an out-of-band request and acknowledge it only after the
    /// active view has been redrawn. `redraw` is the same repaint the
    /// servicing [`Self::next_key`] call uses, so show/change requests
    /// repaint the completion preview or the search display when one of
    /// those is on screen.
    pub(crate) fn apply_control<F>(
        &mut self,
        control: PromptControl,
        redraw: &mut F,
    ) -> Result<(), PromptError>
    where
        F: FnMut(&mut Self) -> Result<(), PromptError>,
    {
        match control.op {
            ControlOp::HidePrompt => {
                self.hidden = true;
                let mut out = self.out.lock().unwrap();
                ansi::cursor_to_column(&mut *out, self.caps, 0)?;
                ansi::erase_to_end_of_line(&mut *out)?;
                out.flush()?;
                tracing::debug!("prompt hidden");
            }
            ControlOp::ShowPrompt => {
                self.hidden = false;
                redraw(self)?;
                tracing::debug!("prompt shown");
            }
            ControlOp::ChangePrompt(text) => {
                self.prompt = text.chars().collect();
                redraw(self)?;
                tracing::debug!("prompt changed");
            }
        }
        let _ = control.ack.send(());
        Ok(())
    }

    fn finish_command(&mut self, kill_cmd: bool, history_cmd: bool, yank_cmd: bool) {
        if kill_cmd {
            self.kill_chain = 2;
        }
        if self.kill_chain > 0 {
            self.kill_chain -= 1;
        }
        if !yank_cmd {
            self.yank = None;
        }
        self.history_action = history_cmd;
    }

    /// Coalesce with the current ring entry only when the previous command
    /// was itself a kill.
    fn kill_mode(&self, chained: KillMode) -> KillMode {
        if self.kill_chain > 0 {
            chained
        } else {
            KillMode::New
        }
    }

    fn apply_kill_effect(
        &mut self,
        effect: Effect,
        chained: KillMode,
    ) -> Result<bool, PromptError> {
        if effect.beep {
            self.beep()?;
            return Ok(false);
        }
        let mut killed_any = false;
        if let Some((from, to)) = effect.delete {
            let killed = self.buf.delete_range(from, to);
            self.kill_ring.kill(&killed, self.kill_mode(chained));
            killed_any = !killed.is_empty();
        }
        self.buf.set_pos(effect.new_pos);
        self.refresh()?;
        Ok(killed_any)
    }

    fn apply_motion_effect(&mut self, effect: Effect) -> Result<(), PromptError> {
        if effect.beep {
            self.beep()?;
            return Ok(());
        }
        self.buf.set_pos(effect.new_pos);
        self.refresh()
    }

    fn insert_rune(&mut self, r: char) -> Result<(), PromptError> {
        use crate::editor_impl::line_buffer::count_glyphs;
        let at_end = self.buf.pos() == self.buf.len();
        let fits = count_glyphs(&self.prompt) + count_glyphs(self.buf.runes())
            < self.cols.saturating_sub(1);
        self.buf.insert(r);
        if at_end && fits && !self.hidden {
            // Fast path: echo the rune in place, no full redraw.
            let mut out = self.out.lock().unwrap();
            let mut utf8 = [0u8; 4];
            out.write_all(r.encode_utf8(&mut utf8).as_bytes())?;
            out.flush()?;
        } else {
            self.refresh()?;
        }
        Ok(())
    }

    fn history_up(&mut self) -> Result<(), PromptError> {
        if !self.history_action {
            self.history_view = self.history.lookup(&self.buf.to_string());
            self.history_pos = self.history_view.len();
        }
        if self.history_pos == 0 {
            return self.beep();
        }
        if self.history_pos == self.history_view.len() {
            self.history_end = self.buf.to_string();
        }
        self.history_pos -= 1;
        self.buf = LineBuffer::from_str(&self.history_view[self.history_pos]);
        self.refresh()
    }

    fn history_down(&mut self) -> Result<(), PromptError> {
        if !self.history_action {
            self.history_view = self.history.lookup(&self.buf.to_string());
            self.history_pos = self.history_view.len();
        }
        if self.history_pos == self.history_view.len() {
            return self.beep();
        }
        self.history_pos += 1;
        let line = if self.history_pos == self.history_view.len() {
            self.history_end.clone()
        } else {
            self.history_view[self.history_pos].clone()
        };
        self.buf = LineBuffer::from_str(&line);
        self.refresh()
    }

    fn at_completion_point(&self) -> bool {
        self.completer.is_some()
            && (self.buf.pos() == self.buf.len()
                || self
                    .buf
                    .runes()
                    .get(self.buf.pos())
                    .is_some_and(|r| r.is_whitespace()))
    }

    /// Redraw the prompt and line. Suppressed while the prompt is hidden.
    ///
    /// # Panics
    ///
    /// Panics if the terminal writer lock is poisoned.
    pub(crate) fn refresh(&mut self) -> Result<(), PromptError> {
        if self.hidden {
            return Ok(());
        }
        let mut out = self.out.lock().unwrap();
        match self.echo {
            EchoMode::Normal => renderer::refresh(
                &mut *out,
                self.caps,
                &self.prompt,
                self.buf.runes(),
                self.buf.pos(),
                self.cols,
            )?,
            EchoMode::Password => renderer::refresh_password(&mut *out, self.caps, &self.prompt)?,
        }
        Ok(())
    }

    /// Redraw with a caller-supplied prompt and line (sub-mode displays).
    pub(crate) fn refresh_line(
        &mut self,
        prompt: &[char],
        line: &LineBuffer,
    ) -> Result<(), PromptError> {
        if self.hidden {
            return Ok(());
        }
        let mut out = self.out.lock().unwrap();
        renderer::refresh(
            &mut *out,
            self.caps,
            prompt,
            line.runes(),
            line.pos(),
            self.cols,
        )?;
        Ok(())
    }

    pub(crate) fn beep(&self) -> Result<(), PromptError> {
        let mut out = self.out.lock().unwrap();
        ansi::beep(&mut *out)?;
        out.flush()?;
        Ok(())
    }

    fn newline(&self) -> Result<(), PromptError> {
        let mut out = self.out.lock().unwrap();
        ansi::newline(&mut *out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::StdoutMock;
    use crate::{Completion, DefaultWordController, CHANNEL_CAPACITY};
    use pretty_assertions::assert_eq;
    use tokio::sync::RwLock;

    struct Harness {
        result: Result<String, PromptError>,
        output: StdoutMock,
        ring: KillRing,
    }

    impl Harness {
        fn line(&self) -> &str {
            self.result.as_deref().expect("prompt should succeed")
        }

        fn bell_count(&self) -> usize {
            self.output
                .contents()
                .iter()
                .filter(|&&b| b == 0x07)
                .count()
        }
    }

    fn runes(s: &str) -> Vec<Key> {
        s.chars().map(Key::Rune).collect()
    }

    async fn run_editor(keys: Vec<Key>, history: &[&str]) -> Harness {
        run_editor_opts(keys, history, None, EchoMode::Normal, 80).await
    }

    async fn run_editor_opts(
        keys: Vec<Key>,
        history_entries: &[&str],
        completer: Option<Arc<dyn Completer>>,
        echo: EchoMode,
        cols: usize,
    ) -> Harness {
        let (key_tx, mut key_rx) = mpsc::channel(CHANNEL_CAPACITY);
        for key in keys {
            key_tx.send(Ok(key)).await.unwrap();
        }
        drop(key_tx);
        let (_resize_tx, mut resize_rx) = mpsc::channel::<()>(1);
        let (_control_tx, mut control_rx) = mpsc::channel::<PromptControl>(1);

        let mut store = History::new();
        for entry in history_entries {
            store.append(entry);
        }
        let history = Arc::new(RwLock::new(store));
        let guard = history.clone().read_owned().await;

        let mut ring = KillRing::new();
        let output = StdoutMock::default();
        let out: SafeRawTerminal = Arc::new(crate::StdMutex::new(output.clone()));

        let result = {
            let mut editor = Editor {
                prompt: "> ".chars().collect(),
                buf: LineBuffer::new(),
                caps: TermCaps {
                    supported: true,
                    use_cha: true,
                },
                cols,
                cols_source: Arc::new(move || cols),
                out,
                history: guard,
                kill_ring: &mut ring,
                completer,
                words: Arc::new(DefaultWordController::new()),
                keys: &mut key_rx,
                resize: &mut resize_rx,
                control: &mut control_rx,
                resize_open: true,
                control_open: true,
                echo,
                hidden: false,
                kill_chain: 0,
                yank: None,
                history_view: Vec::new(),
                history_pos: 0,
                history_end: String::new(),
                history_action: false,
            };
            editor.run().await
        };

        Harness {
            result,
            output,
            ring,
        }
    }

    #[tokio::test]
    async fn test_submit_plain_line() {
        let h = run_editor(runes("hello\r"), &[]).await;
        assert_eq!(h.line(), "hello");
        assert!(h.output.contents_stripped().contains("> hello"));
    }

    #[tokio::test]
    async fn test_ctrl_c_aborts_with_cleared_buffer() {
        let h = run_editor(runes("abc\x03"), &[]).await;
        assert!(matches!(h.result, Err(PromptError::Aborted)));
    }

    #[tokio::test]
    async fn test_ctrl_d_on_empty_line_is_eof() {
        let h = run_editor(vec![Key::Rune(CTRL_D)], &[]).await;
        assert!(matches!(h.result, Err(PromptError::Eof)));
    }

    #[tokio::test]
    async fn test_ctrl_d_at_end_of_line_beeps() {
        let h = run_editor(runes("ab\x04\r"), &[]).await;
        assert_eq!(h.line(), "ab");
        assert_eq!(h.bell_count(), 1);
    }

    #[tokio::test]
    async fn test_ctrl_d_mid_line_deletes() {
        let mut keys = runes("abc");
        keys.push(Key::Rune(CTRL_A));
        keys.push(Key::Rune(CTRL_D));
        keys.extend(runes("\r"));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "bc");
    }

    #[tokio::test]
    async fn test_backspace_at_column_zero_beeps() {
        let h = run_editor(runes("\u{7f}a\r"), &[]).await;
        assert_eq!(h.line(), "a");
        assert_eq!(h.bell_count(), 1);
    }

    #[tokio::test]
    async fn test_arrows_beep_at_both_ends() {
        let mut keys = vec![Key::Act(NamedKey::Left)];
        keys.push(Key::Rune('x'));
        keys.push(Key::Act(NamedKey::Right));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "x");
        assert_eq!(h.bell_count(), 2);
    }

    #[tokio::test]
    async fn test_home_end_and_mid_line_insert() {
        let mut keys = runes("bc");
        keys.push(Key::Rune(CTRL_A));
        keys.push(Key::Rune('a'));
        keys.push(Key::Rune(CTRL_E));
        keys.push(Key::Rune('d'));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "abcd");
    }

    #[tokio::test]
    async fn test_transpose_at_end_swaps_last_two() {
        let h = run_editor(runes("ab\x14\r"), &[]).await;
        assert_eq!(h.line(), "ba");
    }

    #[tokio::test]
    async fn test_transpose_on_short_line_beeps() {
        let h = run_editor(runes("a\x14\r"), &[]).await;
        assert_eq!(h.line(), "a");
        assert_eq!(h.bell_count(), 1);
    }

    #[tokio::test]
    async fn test_unhandled_control_code_beeps() {
        let h = run_editor(runes("\x07\r"), &[]).await;
        assert_eq!(h.line(), "");
        assert_eq!(h.bell_count(), 1);
    }

    #[tokio::test]
    async fn test_standalone_escape_is_a_no_op() {
        let mut keys = runes("ok");
        keys.push(Key::Rune(ESC));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "ok");
        assert_eq!(h.bell_count(), 0);
    }

    // History navigation: prefix-filtered, with the in-progress line saved
    // as the bottom entry.

    const HISTORY: &[&str] = &["foo", "bar", "baz"];

    #[tokio::test]
    async fn test_history_up_recalls_newest_prefix_match() {
        let mut keys = runes("b");
        keys.push(Key::Act(NamedKey::Up));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, HISTORY).await;
        assert_eq!(h.line(), "baz");
    }

    #[tokio::test]
    async fn test_history_up_twice_walks_older() {
        let mut keys = runes("b");
        keys.extend([Key::Act(NamedKey::Up), Key::Act(NamedKey::Up)]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, HISTORY).await;
        assert_eq!(h.line(), "bar");
    }

    #[tokio::test]
    async fn test_history_down_returns_towards_newest() {
        let mut keys = runes("b");
        keys.extend([
            Key::Act(NamedKey::Up),
            Key::Act(NamedKey::Up),
            Key::Act(NamedKey::Down),
        ]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, HISTORY).await;
        assert_eq!(h.line(), "baz");
    }

    #[tokio::test]
    async fn test_history_down_past_newest_restores_typed_line() {
        let mut keys = runes("b");
        keys.extend([Key::Act(NamedKey::Up), Key::Act(NamedKey::Down)]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, HISTORY).await;
        assert_eq!(h.line(), "b");
    }

    #[tokio::test]
    async fn test_history_up_at_oldest_beeps() {
        let mut keys = runes("foo");
        keys.extend([Key::Act(NamedKey::Up), Key::Act(NamedKey::Up)]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, HISTORY).await;
        assert_eq!(h.line(), "foo");
        assert_eq!(h.bell_count(), 1);
    }

    // Kill ring and yank.

    #[tokio::test]
    async fn test_kill_line_then_yank_restores_it() {
        let mut keys = runes("abcdef");
        keys.extend([Key::Rune(CTRL_A), Key::Rune(CTRL_K), Key::Rune(CTRL_Y)]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "abcdef");
        assert_eq!(
            h.ring.current().unwrap().iter().collect::<String>(),
            "abcdef"
        );
    }

    #[tokio::test]
    async fn test_yank_pop_with_single_entry_cycles_in_place() {
        let mut keys = runes("abcdef");
        keys.extend([
            Key::Rune(CTRL_A),
            Key::Rune(CTRL_K),
            Key::Rune(CTRL_Y),
            Key::Act(NamedKey::AltY),
        ]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "abcdef");
    }

    #[tokio::test]
    async fn test_yank_pop_replaces_with_older_kill() {
        let mut keys = runes("one");
        keys.extend([Key::Rune(CTRL_A), Key::Rune(CTRL_K)]);
        keys.extend(runes("two"));
        keys.extend([Key::Rune(CTRL_A), Key::Rune(CTRL_K)]);
        keys.extend([Key::Rune(CTRL_Y), Key::Act(NamedKey::AltY)]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        // Yank put "two" in, Alt-Y swapped it for the older "one".
        assert_eq!(h.line(), "one");
    }

    #[tokio::test]
    async fn test_consecutive_ctrl_w_coalesces_backwards() {
        let mut keys = runes("hello world");
        keys.extend([Key::Rune(CTRL_W), Key::Rune(CTRL_W)]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "");
        assert_eq!(h.ring.len(), 1);
        assert_eq!(
            h.ring.current().unwrap().iter().collect::<String>(),
            "hello world"
        );
    }

    #[tokio::test]
    async fn test_kill_chain_breaks_on_intervening_command() {
        let mut keys = runes("one two");
        keys.push(Key::Rune(CTRL_W));
        keys.push(Key::Rune('x'));
        keys.push(Key::Rune(CTRL_W));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "one ");
        // The insert between the two kills started a fresh ring entry.
        assert_eq!(h.ring.len(), 2);
        assert_eq!(h.ring.current().unwrap().iter().collect::<String>(), "x");
    }

    #[tokio::test]
    async fn test_ctrl_k_then_ctrl_u_coalesces_whole_line() {
        let mut keys = runes("abcd");
        keys.extend([
            Key::Act(NamedKey::Left),
            Key::Act(NamedKey::Left),
            Key::Rune(CTRL_K),
            Key::Rune(CTRL_U),
        ]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "");
        assert_eq!(h.ring.len(), 1);
        assert_eq!(h.ring.current().unwrap().iter().collect::<String>(), "abcd");
    }

    #[tokio::test]
    async fn test_alt_d_deletes_next_word() {
        let mut keys = runes("one two");
        keys.push(Key::Rune(CTRL_A));
        keys.push(Key::Act(NamedKey::AltD));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), " two");
        assert_eq!(h.ring.current().unwrap().iter().collect::<String>(), "one");
    }

    #[tokio::test]
    async fn test_word_motion_keys() {
        let mut keys = runes("one two three");
        keys.extend([
            Key::Act(NamedKey::WordLeft),
            Key::Act(NamedKey::WordLeft),
            Key::Act(NamedKey::AltD),
        ]);
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &[]).await;
        assert_eq!(h.line(), "one  three");
    }

    // Reverse-i-search.

    #[tokio::test]
    async fn test_reverse_search_finds_and_submits() {
        let mut keys = vec![Key::Rune(CTRL_R)];
        keys.extend(runes("com"));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &["git status", "git commit"]).await;
        assert_eq!(h.line(), "git commit");
        assert!(h
            .output
            .contents_stripped()
            .contains("(reverse-i-search)`com': git commit"));
    }

    #[tokio::test]
    async fn test_reverse_search_steps_to_older_match() {
        let mut keys = vec![Key::Rune(CTRL_R)];
        keys.extend(runes("echo"));
        keys.push(Key::Rune(CTRL_R));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &["echo one", "echo two"]).await;
        assert_eq!(h.line(), "echo one");
    }

    #[tokio::test]
    async fn test_reverse_search_cancel_restores_line() {
        let mut keys = runes("typed");
        keys.push(Key::Rune(CTRL_R));
        keys.extend(runes("com"));
        keys.push(Key::Rune(CTRL_G));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &["git commit"]).await;
        assert_eq!(h.line(), "typed");
    }

    #[tokio::test]
    async fn test_reverse_search_exit_key_is_redispatched() {
        // End exits the search and then acts on the adopted line, so the
        // following insert lands at the end of the match.
        let mut keys = vec![Key::Rune(CTRL_R)];
        keys.extend(runes("abc"));
        keys.push(Key::Act(NamedKey::End));
        keys.push(Key::Rune('!'));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &["abc"]).await;
        assert_eq!(h.line(), "abc!");
    }

    #[tokio::test]
    async fn test_reverse_search_no_match_beeps_and_keeps_query() {
        let mut keys = vec![Key::Rune(CTRL_R)];
        keys.extend(runes("zzz"));
        keys.push(Key::Rune(CR));
        let h = run_editor(keys, &["abc"]).await;
        // The query never matched, so the adopted match is the full-history
        // default ("abc") and every rejected rune beeped.
        assert_eq!(h.line(), "abc");
        assert_eq!(h.bell_count(), 3);
    }

    // Tab completion.

    fn fixed_completer() -> Option<Arc<dyn Completer>> {
        Some(Arc::new(|_line: &str, _pos: usize| Completion {
            head: "pre".into(),
            candidates: vec!["fix".into(), "sent".into()],
            tail: "post".into(),
        }))
    }

    #[tokio::test]
    async fn test_tab_completion_inserts_first_candidate() {
        let keys = vec![Key::Rune(TAB), Key::Rune(CR)];
        let h = run_editor_opts(keys, &[], fixed_completer(), EchoMode::Normal, 80).await;
        assert_eq!(h.line(), "prefixpost");
    }

    #[tokio::test]
    async fn test_tab_completion_cycles_and_wraps() {
        let keys = vec![Key::Rune(TAB), Key::Rune(TAB), Key::Rune(CR)];
        let h = run_editor_opts(keys, &[], fixed_completer(), EchoMode::Normal, 80).await;
        assert_eq!(h.line(), "presentpost");

        let keys = vec![
            Key::Rune(TAB),
            Key::Rune(TAB),
            Key::Rune(TAB),
            Key::Rune(CR),
        ];
        let h = run_editor_opts(keys, &[], fixed_completer(), EchoMode::Normal, 80).await;
        assert_eq!(h.line(), "prefixpost");
    }

    #[tokio::test]
    async fn test_tab_completion_shift_tab_cycles_backwards() {
        let keys = vec![Key::Rune(TAB), Key::Act(NamedKey::ShiftTab), Key::Rune(CR)];
        let h = run_editor_opts(keys, &[], fixed_completer(), EchoMode::Normal, 80).await;
        assert_eq!(h.line(), "presentpost");
    }

    #[tokio::test]
    async fn test_tab_completion_escape_restores_original() {
        let mut keys = vec![Key::Rune(TAB), Key::Rune(ESC)];
        keys.extend(runes("x\r"));
        let h = run_editor_opts(keys, &[], fixed_completer(), EchoMode::Normal, 80).await;
        assert_eq!(h.line(), "x");
    }

    #[tokio::test]
    async fn test_tab_without_completer_beeps() {
        let h = run_editor(vec![Key::Rune(TAB), Key::Rune(CR)], &[]).await;
        assert_eq!(h.line(), "");
        assert_eq!(h.bell_count(), 1);
    }

    #[tokio::test]
    async fn test_tab_with_no_candidates_is_silent() {
        let empty: Option<Arc<dyn Completer>> =
            Some(Arc::new(|_: &str, _: usize| Completion::default()));
        let h = run_editor_opts(
            vec![Key::Rune(TAB), Key::Rune(CR)],
            &[],
            empty,
            EchoMode::Normal,
            80,
        )
        .await;
        assert_eq!(h.line(), "");
        assert_eq!(h.bell_count(), 0);
    }

    // Password mode.

    #[tokio::test]
    async fn test_password_prompt_never_echoes() {
        let h = run_editor_opts(runes("secret\r"), &[], None, EchoMode::Password, 80).await;
        assert_eq!(h.line(), "secret");
        assert!(!h.output.contents_stripped().contains("secret"));
    }

    #[tokio::test]
    async fn test_password_prompt_backspace_edits_blind() {
        let h = run_editor_opts(runes("abcd\u{7f}\u{7f}xy\r"), &[], None, EchoMode::Password, 80)
            .await;
        assert_eq!(h.line(), "abxy");
    }

    #[tokio::test]
    async fn test_password_prompt_ignores_history_keys() {
        let mut keys = runes("pw");
        keys.push(Key::Act(NamedKey::Up));
        keys.push(Key::Rune(CR));
        let h = run_editor_opts(keys, &["oops"], None, EchoMode::Password, 80).await;
        assert_eq!(h.line(), "pw");
        assert_eq!(h.bell_count(), 1);
    }

    // Rendering-adjacent behaviour.

    #[tokio::test]
    async fn test_overflowing_insert_takes_scroll_path() {
        let h = run_editor(runes(&format!("{}\r", "x".repeat(30))), &[]).await;
        let _ = h.line();
        // With 80 columns nothing scrolls...
        assert!(!h.output.contents_stripped().contains('}'));

        let h = run_editor_opts(
            runes(&format!("{}\r", "x".repeat(30))),
            &[],
            None,
            EchoMode::Normal,
            12,
        )
        .await;
        let _ = h.line();
        // ...but in 12 columns the refresh clips with a scroll marker.
        assert!(h.output.contents_stripped().contains('{'));
    }

    #[tokio::test]
    async fn test_resize_requeries_columns() {
        let (key_tx, mut key_rx) = mpsc::channel(CHANNEL_CAPACITY);
        drop(key_tx);
        let (_resize_tx, mut resize_rx) = mpsc::channel::<()>(1);
        let (_control_tx, mut control_rx) = mpsc::channel::<PromptControl>(1);
        let history = Arc::new(RwLock::new(History::new()));
        let guard = history.clone().read_owned().await;
        let mut ring = KillRing::new();
        let output = StdoutMock::default();
        let out: SafeRawTerminal = Arc::new(crate::StdMutex::new(output.clone()));

        let mut editor = Editor {
            prompt: "> ".chars().collect(),
            buf: LineBuffer::from_str("hello"),
            caps: TermCaps {
                supported: true,
                use_cha: true,
            },
            cols: 80,
            cols_source: Arc::new(|| 33),
            out,
            history: guard,
            kill_ring: &mut ring,
            completer: None,
            words: Arc::new(DefaultWordController::new()),
            keys: &mut key_rx,
            resize: &mut resize_rx,
            control: &mut control_rx,
            resize_open: true,
            control_open: true,
            echo: EchoMode::Normal,
            hidden: false,
            kill_chain: 0,
            yank: None,
            history_view: Vec::new(),
            history_pos: 0,
            history_end: String::new(),
            history_action: false,
        };

        let outcome = editor.dispatch(Key::Resize).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(editor.cols, 33);
    }

    #[tokio::test]
    async fn test_hide_show_control_round_trip() {
        let (key_tx, mut key_rx) = mpsc::channel(CHANNEL_CAPACITY);
        drop(key_tx);
        let (_resize_tx, mut resize_rx) = mpsc::channel::<()>(1);
        let (_control_tx, mut control_rx) = mpsc::channel::<PromptControl>(1);
        let history = Arc::new(RwLock::new(History::new()));
        let guard = history.clone().read_owned().await;
        let mut ring = KillRing::new();
        let output = StdoutMock::default();
        let out: SafeRawTerminal = Arc::new(crate::StdMutex::new(output.clone()));

        let mut editor = Editor {
            prompt: "> ".chars().collect(),
            buf: LineBuffer::from_str("typed"),
            caps: TermCaps {
                supported: true,
                use_cha: true,
            },
            cols: 80,
            cols_source: Arc::new(|| 80),
            out,
            history: guard,
            kill_ring: &mut ring,
            completer: None,
            words: Arc::new(DefaultWordController::new()),
            keys: &mut key_rx,
            resize: &mut resize_rx,
            control: &mut control_rx,
            resize_open: true,
            control_open: true,
            echo: EchoMode::Normal,
            hidden: false,
            kill_chain: 0,
            yank: None,
            history_view: Vec::new(),
            history_pos: 0,
            history_end: String::new(),
            history_action: false,
        };

        let (ack_tx, mut ack_rx) = tokio::sync::oneshot::channel();
        editor
            .apply_control(
                PromptControl {
                    op: ControlOp::HidePrompt,
                    ack: ack_tx,
                },
                &mut Editor::refresh,
            )
            .unwrap();
        assert!(editor.hidden);
        // The ack fired after the row was cleared.
        assert!(ack_rx.try_recv().is_ok());

        // While hidden, refreshes draw nothing.
        let before = output.contents().len();
        editor.refresh().unwrap();
        assert_eq!(output.contents().len(), before);

        let (ack_tx, mut ack_rx) = tokio::sync::oneshot::channel();
        editor
            .apply_control(
                PromptControl {
                    op: ControlOp::ShowPrompt,
                    ack: ack_tx,
                },
                &mut Editor::refresh,
            )
            .unwrap();
        assert!(!editor.hidden);
        assert!(ack_rx.try_recv().is_ok());
        assert!(output.contents_stripped().contains("> typed"));
    }

    #[tokio::test]
    async fn test_change_prompt_control() {
        let (key_tx, mut key_rx) = mpsc::channel(CHANNEL_CAPACITY);
        drop(key_tx);
        let (_resize_tx, mut resize_rx) = mpsc::channel::<()>(1);
        let (_control_tx, mut control_rx) = mpsc::channel::<PromptControl>(1);
        let history = Arc::new(RwLock::new(History::new()));
        let guard = history.clone().read_owned().await;
        let mut ring = KillRing::new();
        let output = StdoutMock::default();
        let out: SafeRawTerminal = Arc::new(crate::StdMutex::new(output.clone()));

        let mut editor = Editor {
            prompt: "> ".chars().collect(),
            buf: LineBuffer::from_str("keep"),
            caps: TermCaps {
                supported: true,
                use_cha: true,
            },
            cols: 80,
            cols_source: Arc::new(|| 80),
            out,
            history: guard,
            kill_ring: &mut ring,
            completer: None,
            words: Arc::new(DefaultWordController::new()),
            keys: &mut key_rx,
            resize: &mut resize_rx,
            control: &mut control_rx,
            resize_open: true,
            control_open: true,
            echo: EchoMode::Normal,
            hidden: false,
            kill_chain: 0,
            yank: None,
            history_view: Vec::new(),
            history_pos: 0,
            history_end: String::new(),
            history_action: false,
        };

        let (ack_tx, _ack_rx) = tokio::sync::oneshot::channel();
        editor
            .apply_control(
                PromptControl {
                    op: ControlOp::ChangePrompt("db> ".into()),
                    ack: ack_tx,
                },
                &mut Editor::refresh,
            )
            .unwrap();
        assert!(output.contents_stripped().contains("db> keep"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_is_serviced_inside_tab_complete() {
        let (key_tx, mut key_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (resize_tx, mut resize_rx) = mpsc::channel::<()>(1);
        let (_control_tx, mut control_rx) = mpsc::channel::<PromptControl>(1);
        let history = Arc::new(RwLock::new(History::new()));
        let guard = history.clone().read_owned().await;
        let mut ring = KillRing::new();
        let output = StdoutMock::default();
        let out: SafeRawTerminal = Arc::new(crate::StdMutex::new(output.clone()));

        let mut editor = Editor {
            prompt: "> ".chars().collect(),
            buf: LineBuffer::new(),
            caps: TermCaps {
                supported: true,
                use_cha: true,
            },
            cols: 80,
            cols_source: Arc::new(|| 24),
            out,
            history: guard,
            kill_ring: &mut ring,
            completer: fixed_completer(),
            words: Arc::new(DefaultWordController::new()),
            keys: &mut key_rx,
            resize: &mut resize_rx,
            control: &mut control_rx,
            resize_open: true,
            control_open: true,
            echo: EchoMode::Normal,
            hidden: false,
            kill_chain: 0,
            yank: None,
            history_view: Vec::new(),
            history_pos: 0,
            history_end: String::new(),
            history_action: false,
        };

        // The sleeps sequence the channels deterministically under the
        // paused clock: the resize lands while the completion menu is open
        // and waiting for its next key.
        let feeder = tokio::spawn(async move {
            key_tx.send(Ok(Key::Rune(TAB))).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            resize_tx.send(()).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            key_tx.send(Ok(Key::Rune(ESC))).await.unwrap();
            key_tx.send(Ok(Key::Rune(CR))).await.unwrap();
        });

        let result = editor.run().await;
        feeder.await.unwrap();

        assert_eq!(result.unwrap(), "");
        // The new width took effect mid-completion, not after exit.
        assert_eq!(editor.cols, 24);
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_prompt_is_serviced_inside_reverse_search() {
        let (key_tx, mut key_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (_resize_tx, mut resize_rx) = mpsc::channel::<()>(1);
        let (control_tx, mut control_rx) = mpsc::channel::<PromptControl>(1);
        let mut store = History::new();
        store.append("git commit");
        let history = Arc::new(RwLock::new(store));
        let guard = history.clone().read_owned().await;
        let mut ring = KillRing::new();
        let output = StdoutMock::default();
        let out: SafeRawTerminal = Arc::new(crate::StdMutex::new(output.clone()));

        let mut editor = Editor {
            prompt: "> ".chars().collect(),
            buf: LineBuffer::new(),
            caps: TermCaps {
                supported: true,
                use_cha: true,
            },
            cols: 80,
            cols_source: Arc::new(|| 80),
            out,
            history: guard,
            kill_ring: &mut ring,
            completer: None,
            words: Arc::new(DefaultWordController::new()),
            keys: &mut key_rx,
            resize: &mut resize_rx,
            control: &mut control_rx,
            resize_open: true,
            control_open: true,
            echo: EchoMode::Normal,
            hidden: false,
            kill_chain: 0,
            yank: None,
            history_view: Vec::new(),
            history_pos: 0,
            history_end: String::new(),
            history_action: false,
        };

        let feeder = tokio::spawn(async move {
            key_tx.send(Ok(Key::Rune(CTRL_R))).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            let (ack_tx, ack_rx) = tokio::sync::oneshot::channel();
            control_tx
                .send(PromptControl {
                    op: ControlOp::ChangePrompt("db> ".into()),
                    ack: ack_tx,
                })
                .await
                .unwrap();
            // The ack resolves while the search is still open; only then is
            // the exit key sent.
            ack_rx.await.unwrap();
            key_tx.send(Ok(Key::Rune(CR))).await.unwrap();
        });

        let result = editor.run().await;
        feeder.await.unwrap();

        assert_eq!(result.unwrap(), "git commit");
        assert_eq!(editor.prompt.iter().collect::<String>(), "db> ");
    }
}
