// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

use crate::editor_impl::editor::{EchoMode, Editor};
use crate::public_api::fallback;
use crate::{
    spawn_decoder_task, spawn_resize_task, Completer, ControlOp, DefaultWordController, History,
    HistoryMode, Key, KillRing, LineBuffer, LineCompleter, PinnedByteSource, PromptControl,
    PromptError, RawModeGuard, SafeHistory, SafeRawTerminal, StdMutex, TermCaps, WordController,
    CHANNEL_CAPACITY,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, RwLock};

/// The long-lived owner of everything a sequence of prompts shares: the
/// history store, the kill ring, the key-decoder task reading the terminal,
/// and the out-of-band control channel.
///
/// One `Session` serves one terminal. Create it once, call
/// [`Session::prompt`] in a loop, and [`Session::close`] (or drop) when
/// done. Editing state itself lives only for the duration of a single
/// `prompt()` call; raw mode is acquired at its start and restored on every
/// exit path.
pub struct Session {
    history: SafeHistory,
    kill_ring: KillRing,
    completer: Option<Arc<dyn Completer>>,
    words: Arc<dyn WordController>,
    out: SafeRawTerminal,
    caps: TermCaps,

    control_tx: mpsc::Sender<PromptControl>,
    control_rx: mpsc::Receiver<PromptControl>,
    active_tx: watch::Sender<bool>,
    active_rx: watch::Receiver<bool>,

    key_rx: Option<mpsc::Receiver<io::Result<Key>>>,
    resize_rx: Option<mpsc::Receiver<()>>,
    decoder_task: Option<tokio::task::JoinHandle<()>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session on standard output, with capabilities detected from `TERM`.
    #[must_use]
    pub fn new() -> Self {
        // The control channel stays small so requests are applied in order,
        // one redraw per acknowledgement.
        let (control_tx, control_rx) = mpsc::channel(1);
        let (active_tx, active_rx) = watch::channel(false);
        let out: SafeRawTerminal = Arc::new(StdMutex::new(io::stdout()));
        Self {
            history: Arc::new(RwLock::new(History::new())),
            kill_ring: KillRing::new(),
            completer: None,
            words: Arc::new(DefaultWordController::new()),
            out,
            caps: TermCaps::detect(),
            control_tx,
            control_rx,
            active_tx,
            active_rx,
            key_rx: None,
            resize_rx: None,
            decoder_task: None,
        }
    }

    /// Install a completer using the full head/candidates/tail protocol.
    pub fn set_completer(&mut self, completer: impl Completer + 'static) {
        self.completer = Some(Arc::new(completer));
    }

    /// Install a completer in the simpler shape: the text left of the caret
    /// in, whole-line replacements out.
    pub fn set_line_completer<F>(&mut self, completer: F)
    where
        F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
    {
        self.completer = Some(Arc::new(LineCompleter(completer)));
    }

    /// Replace the word controller (word motion / word erase strategy).
    pub fn set_word_controller(&mut self, words: impl WordController + 'static) {
        self.words = Arc::new(words);
    }

    /// Switch Up/Down recall between prefix and substring filtering.
    pub async fn set_history_mode(&self, mode: HistoryMode) {
        self.history.write().await.set_mode(mode);
    }

    /// Append an entry to the scrollback history. Call this after
    /// [`Session::prompt`] returns a line worth keeping; the editor never
    /// appends on its own. Waits while a prompt is live, because the editor
    /// holds the history read lock until it finishes.
    pub async fn append_history(&self, item: &str) {
        self.history.write().await.append(item);
    }

    /// Import history, one entry per line. See [`History::read_from`].
    ///
    /// # Errors
    ///
    /// [`PromptError::Io`] or [`PromptError::InvalidHistory`]; entries read
    /// before a malformed line are kept.
    pub async fn read_history<R: BufRead>(&self, reader: R) -> Result<usize, PromptError> {
        self.history.write().await.read_from(reader)
    }

    /// Export history, one entry per line. See [`History::write_to`].
    ///
    /// # Errors
    ///
    /// [`PromptError::Io`] on write failure.
    pub async fn write_history<W: Write>(&self, writer: &mut W) -> Result<usize, PromptError> {
        self.history.read().await.write_to(writer)
    }

    /// Display `text` and edit one line of input.
    ///
    /// # Errors
    ///
    /// [`PromptError::Eof`] on Ctrl-D over an empty line or closed input,
    /// [`PromptError::Aborted`] on Ctrl-C, [`PromptError::NotATerminal`]
    /// when output is redirected, [`PromptError::Io`] on terminal failures.
    pub async fn prompt(&mut self, text: &str) -> Result<String, PromptError> {
        self.run_prompt(text, EchoMode::Normal).await
    }

    /// Like [`Session::prompt`], but echo-suppressed and with a restricted
    /// command set (submit, abort, EOF, backspace, clear screen).
    ///
    /// # Errors
    ///
    /// As [`Session::prompt`], plus [`PromptError::Unsupported`] when the
    /// terminal cannot suppress echo (the plain-read fallback would show the
    /// secret).
    pub async fn password_prompt(&mut self, text: &str) -> Result<String, PromptError> {
        if !self.caps.supported {
            return Err(PromptError::Unsupported);
        }
        self.run_prompt(text, EchoMode::Password).await
    }

    async fn run_prompt(&mut self, text: &str, echo: EchoMode) -> Result<String, PromptError> {
        use crossterm::tty::IsTty as _;
        if !io::stdout().is_tty() {
            return Err(PromptError::NotATerminal);
        }
        self.ensure_input_tasks();

        if !self.caps.supported {
            tracing::debug!("unsupported terminal, using plain line read");
            let keys = self.key_rx.as_mut().expect("input task spawned");
            return fallback::read_plain_line(text, &self.out, keys).await;
        }

        let cols = crate::terminal_impl::columns();
        if cols == 0 {
            return Err(PromptError::NotATerminal);
        }

        let mut raw = RawModeGuard::enter()?;
        // Held until the editor finishes: recall indices stay valid because
        // no writer can touch the store mid-prompt.
        let history = self.history.clone().read_owned().await;

        // Requests left over from a cancelled prompt must not replay here.
        self.drain_pending_controls();
        let active = ActiveGuard::raise(&self.active_tx);

        let result = {
            let mut editor = Editor {
                prompt: text.chars().collect(),
                buf: LineBuffer::new(),
                caps: self.caps,
                cols,
                cols_source: Arc::new(crate::terminal_impl::columns),
                out: self.out.clone(),
                history,
                kill_ring: &mut self.kill_ring,
                completer: self.completer.clone(),
                words: self.words.clone(),
                keys: self.key_rx.as_mut().expect("input task spawned"),
                resize: self.resize_rx.as_mut().expect("resize task spawned"),
                control: &mut self.control_rx,
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

        drop(active);
        self.drain_pending_controls();
        raw.leave()?;
        result
    }

    /// A cloneable handle other tasks use to hide, show, or replace the
    /// prompt while a prompt is being edited.
    #[must_use]
    pub fn controller(&self) -> PromptController {
        PromptController {
            control_tx: self.control_tx.clone(),
            active_rx: self.active_rx.clone(),
        }
    }

    /// Clear the prompt row and pause rendering. Returns after the editor
    /// has applied the change; a no-op when no prompt is live.
    pub async fn hide_prompt(&self) {
        self.controller().hide_prompt().await;
    }

    /// Resume rendering and redraw. Returns after the redraw; a no-op when
    /// no prompt is live.
    pub async fn show_prompt(&self) {
        self.controller().show_prompt().await;
    }

    /// Replace the prompt text mid-edit. Returns after the redraw; a no-op
    /// when no prompt is live.
    pub async fn change_prompt(&self, text: &str) {
        self.controller().change_prompt(text).await;
    }

    /// Stop the helper tasks. Raw mode is per-prompt and already restored
    /// by the time this can run.
    pub fn close(&mut self) {
        if let Some(task) = self.decoder_task.take() {
            task.abort();
        }
        self.key_rx = None;
        self.resize_rx = None;
        self.drain_pending_controls();
        let _ = self.active_tx.send(false);
    }

    fn ensure_input_tasks(&mut self) {
        if self.key_rx.is_none() {
            let (key_tx, key_rx) = mpsc::channel(CHANNEL_CAPACITY);
            let source: PinnedByteSource = Box::pin(tokio::io::stdin());
            self.decoder_task = Some(spawn_decoder_task(source, key_tx));
            self.key_rx = Some(key_rx);
        }
        if self.resize_rx.is_none() {
            self.resize_rx = Some(spawn_resize_task());
        }
    }

    /// Requests that raced against the end of a prompt are acknowledged as
    /// no-ops so their senders never hang.
    fn drain_pending_controls(&mut self) {
        while let Ok(control) = self.control_rx.try_recv() {
            let _ = control.ack.send(());
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cloneable sender side of the out-of-band prompt control channel.
///
/// Every method resolves once the live editor has applied the request and
/// redrawn, or immediately when no prompt is being edited.
#[derive(Clone)]
pub struct PromptController {
    control_tx: mpsc::Sender<PromptControl>,
    active_rx: watch::Receiver<bool>,
}

impl PromptController {
    pub async fn hide_prompt(&self) {
        self.send(ControlOp::HidePrompt).await;
    }

    pub async fn show_prompt(&self) {
        self.send(ControlOp::ShowPrompt).await;
    }

    pub async fn change_prompt(&self, text: &str) {
        self.send(ControlOp::ChangePrompt(text.to_owned())).await;
    }

    async fn send(&self, op: ControlOp) {
        let mut active_rx = self.active_rx.clone();
        if !*active_rx.borrow_and_update() {
            return;
        }
        let (ack_tx, ack_rx) = oneshot::channel();
        let request = PromptControl { op, ack: ack_tx };
        tokio::select! {
            sent = self.control_tx.send(request) => {
                if sent.is_err() {
                    return;
                }
                // The editor can exit between accepting the request and
                // acknowledging it; the drain at prompt exit acks then.
                tokio::select! {
                    _ = ack_rx => {}
                    () = editing_finished(&mut active_rx) => {}
                }
            }
            () = editing_finished(&mut active_rx) => {}
        }
    }
}

/// Marks the editor live for the duration of a prompt. A drop guard so the
/// flag falls back to false even when the prompt future is cancelled.
struct ActiveGuard<'a> {
    tx: &'a watch::Sender<bool>,
}

impl<'a> ActiveGuard<'a> {
    fn raise(tx: &'a watch::Sender<bool>) -> Self {
        let _ = tx.send(true);
        Self { tx }
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        let _ = self.tx.send(false);
    }
}

/// Resolves once no editor is live (or the session is gone).
async fn editing_finished(active_rx: &mut watch::Receiver<bool>) {
    while *active_rx.borrow_and_update() {
        if active_rx.changed().await.is_err() {
            break;
        }
    }
}
