// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! `promptline` is an interactive single-line editor for text-mode terminals.
//! It prints a prompt, lets the user edit a line of input with the usual
//! Emacs-style keyboard commands, and returns the completed line. It is the
//! input layer a REPL, shell, or database client embeds.
//!
//! # Features
//!
//! 1. Full line editing in a single physical terminal row: cursor motion,
//!    word motion, kill/yank with a kill ring, transpose, clear screen. Long
//!    lines scroll horizontally under the caret with `{`/`}` markers.
//!
//! 2. History recall with prefix (or substring) filtering, bounded to
//!    [`HISTORY_LIMIT`] entries, plus incremental reverse search (Ctrl-R)
//!    and history file import/export.
//!
//! 3. Tab completion through a pluggable [`Completer`], with candidate
//!    cycling and inline preview.
//!
//! 4. Out-of-band prompt control: other tasks can hide, show, or replace the
//!    prompt while the user is editing, via a cloneable [`PromptController`].
//!    Each call returns only after the editor has applied the change and
//!    redrawn.
//!
//! 5. All caret motion and width math is done in grapheme clusters, so
//!    combining marks never split under the cursor.
//!
//! # How it works
//!
//! A [`Session`] owns the long-lived pieces: the history store, the kill
//!  ring, and a decoder task that turns raw terminal bytes into [`Key`]
//! events. Each call to [`Session::prompt`] puts the terminal into raw mode
//! (restored on every exit path), then runs a cooperative editor loop that
//! `select!`s over three bounded channels: key events, resize notifications,
//! and out-of-band control requests. Every command handler is synchronous
//! and finite; blocking I/O happens only in the helper tasks.
//!
//! When the terminal is not supported (`TERM` is empty, `dumb`, or
//! `cons25`), prompting silently degrades to a plain buffered line read.
//! When standard output is not a terminal at all, [`Session::prompt`]
//! returns [`PromptError::NotATerminal`].
//!
//! # Example
//!
//! ```no_run
//! use promptline::Session;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), promptline::PromptError> {
//!     let mut session = Session::new();
//!     loop {
//!         match session.prompt("> ").await {
//!             Ok(line) => {
//!                 session.append_history(&line).await;
//!                 println!("got: {line}");
//!             }
//!             Err(promptline::PromptError::Eof) => break,
//!             Err(promptline::PromptError::Aborted) => continue,
//!             Err(err) => return Err(err),
//!         }
//!     }
//!     session.close();
//!     Ok(())
//! }
//! ```

// Attach sources.
pub mod editor_impl;
pub mod public_api;
pub mod terminal_impl;

// Re-export the public API.
pub use editor_impl::*;
pub use public_api::*;
pub use terminal_impl::*;

#[cfg(test)]
pub mod test_fixtures;

use std::{io::Write, pin::Pin, sync::Arc};
use tokio::io::AsyncRead;

// Type aliases.
pub type StdMutex<T> = std::sync::Mutex<T>;

pub type SendRawTerminal = dyn Write + Send;
pub type SafeRawTerminal = Arc<StdMutex<SendRawTerminal>>;

pub type SafeHistory = Arc<tokio::sync::RwLock<History>>;

/// Source of raw terminal bytes consumed by the key decoder task. Typically
/// [`tokio::io::stdin`]; tests supply an in-memory reader.
pub type PinnedByteSource = Pin<Box<dyn AsyncRead + Send>>;

// Constants.
pub const CHANNEL_CAPACITY: usize = 1_000;

/// Maximum number of entries kept in the scrollback history.
pub const HISTORY_LIMIT: usize = 1_000;

/// Longest accepted line (in bytes) when importing a history file.
pub const HISTORY_LINE_MAX: usize = 4_096;

/// Maximum number of entries kept in the kill ring.
pub const KILL_RING_MAX: usize = 60;

/// How long the key decoder waits for the remainder of an escape sequence
/// before treating the `ESC` as a standalone keypress.
pub const ESC_TIMEOUT_MS: u64 = 50;
