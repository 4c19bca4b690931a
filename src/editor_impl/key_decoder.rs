// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Turns the raw byte stream from the terminal into tagged [`Key`] events.
//!
//! The interesting part is escape handling. After an `ESC` the decoder waits
//! up to [`ESC_TIMEOUT_MS`] for the rest of a sequence; every rune consumed
//! while a sequence is incomplete is remembered in a pending queue. A
//! recognised sequence clears the queue. A timeout, end of input, or an
//! unknown introducer *replays* the queued runes as individual [`Key::Rune`]
//! events instead: no byte is ever lost, it is just no longer an escape.
//!
//! The decoder runs on its own task ([`spawn_decoder_task`]) and pushes
//! events into a bounded channel; the editor selects on the receiving end.

use crate::{PinnedByteSource, ESC_TIMEOUT_MS};
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::sync::mpsc;

pub const ESC: char = '\x1b';

/// Named keys that do not carry a rune of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    ShiftTab,
    WordLeft,
    WordRight,
    AltB,
    AltD,
    AltF,
    AltY,
    AltBackspace,
    Unknown,
}

/// One keyboard (or resize) event, as consumed by the editor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Rune(char),
    Act(NamedKey),
    /// The terminal changed size; the editor re-queries the column count.
    Resize,
}

/// Incremental byte → rune → [`Key`] decoder.
///
/// Reads are cancel-safe: a partially received UTF-8 rune survives an escape
/// timeout because the bytes accumulate in `partial`, not in a dropped
/// future.
pub struct KeyDecoder<R> {
    reader: BufReader<R>,
    /// Runes consumed by an escape sequence that failed to match, waiting to
    /// be replayed one per [`Self::next_key`] call.
    pending: VecDeque<char>,
    /// Bytes of a not-yet-complete UTF-8 rune.
    partial: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> KeyDecoder<R> {
    pub fn new(source: R) -> Self {
        Self {
            reader: BufReader::new(source),
            pending: VecDeque::new(),
            partial: Vec::with_capacity(4),
            eof: false,
        }
    }

    /// The next key event, or `None` once the input is exhausted and the
    /// pending queue is drained.
    ///
    /// # Errors
    ///
    /// Propagates read failures from the underlying source.
    pub async fn next_key(&mut self) -> io::Result<Option<Key>> {
        if let Some(r) = self.pending.pop_front() {
            return Ok(Some(Key::Rune(r)));
        }
        if self.eof {
            return Ok(None);
        }
        let Some(r) = self.read_rune().await? else {
            return Ok(None);
        };
        if r != ESC {
            return Ok(Some(Key::Rune(r)));
        }
        self.decode_escape().await
    }

    /// `ESC` was just consumed; decide what it introduces.
    async fn decode_escape(&mut self) -> io::Result<Option<Key>> {
        let Some(introducer) = self.read_rune_timed().await? else {
            // Timed out (or input ended): a standalone escape keypress.
            return Ok(Some(Key::Rune(ESC)));
        };
        match introducer {
            '[' => self.decode_csi().await,
            'O' => self.decode_ss3().await,
            // Meta-letter combinations arrive as ESC + letter.
            'b' => Ok(Some(Key::Act(NamedKey::AltB))),
            'd' => Ok(Some(Key::Act(NamedKey::AltD))),
            'f' => Ok(Some(Key::Act(NamedKey::AltF))),
            'y' => Ok(Some(Key::Act(NamedKey::AltY))),
            '\x08' | '\x7f' => Ok(Some(Key::Act(NamedKey::AltBackspace))),
            other => {
                tracing::debug!(?other, "unknown escape introducer; replaying");
                self.pending.push_back(other);
                Ok(Some(Key::Rune(ESC)))
            }
        }
    }

    /// `ESC [` was consumed: parameters (digits, `;`) then a final byte.
    async fn decode_csi(&mut self) -> io::Result<Option<Key>> {
        let mut params = String::new();
        loop {
            let Some(c) = self.read_rune_timed().await? else {
                // Incomplete sequence: replay everything after the ESC.
                self.pending.push_back('[');
                self.pending.extend(params.chars());
                return Ok(Some(Key::Rune(ESC)));
            };
            match c {
                '0'..='9' | ';' => params.push(c),
                final_byte => return Ok(Some(Key::Act(csi_action(&params, final_byte)))),
            }
        }
    }

    /// `ESC O` was consumed: a single selector rune follows.
    async fn decode_ss3(&mut self) -> io::Result<Option<Key>> {
        let Some(c) = self.read_rune_timed().await? else {
            self.pending.push_back('O');
            return Ok(Some(Key::Rune(ESC)));
        };
        let action = match c {
            'H' => NamedKey::Home,
            'F' => NamedKey::End,
            'P' => NamedKey::F1,
            'Q' => NamedKey::F2,
            'R' => NamedKey::F3,
            'S' => NamedKey::F4,
            _ => NamedKey::Unknown,
        };
        Ok(Some(Key::Act(action)))
    }

    /// One rune, or `None` when [`ESC_TIMEOUT_MS`] elapses or input ends.
    async fn read_rune_timed(&mut self) -> io::Result<Option<char>> {
        match tokio::time::timeout(Duration::from_millis(ESC_TIMEOUT_MS), self.read_rune()).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(None),
        }
    }

    /// One UTF-8 decoded rune; `None` at end of input.
    async fn read_rune(&mut self) -> io::Result<Option<char>> {
        loop {
            if let Some(r) = take_complete_rune(&mut self.partial) {
                return Ok(Some(r));
            }
            let mut byte = [0u8; 1];
            let n = self.reader.read(&mut byte).await?;
            if n == 0 {
                self.eof = true;
                if self.partial.is_empty() {
                    return Ok(None);
                }
                // Truncated rune at end of input.
                self.partial.clear();
                return Ok(Some(char::REPLACEMENT_CHARACTER));
            }
            self.partial.push(byte[0]);
        }
    }
}

fn csi_action(params: &str, final_byte: char) -> NamedKey {
    match (params, final_byte) {
        ("", 'A') => NamedKey::Up,
        ("", 'B') => NamedKey::Down,
        ("", 'C') => NamedKey::Right,
        ("", 'D') => NamedKey::Left,
        ("", 'Z') => NamedKey::ShiftTab,
        // Ctrl-arrow (bare Ctrl modifier) is word motion.
        ("1;5", 'C') => NamedKey::WordRight,
        ("1;5", 'D') => NamedKey::WordLeft,
        (_, '~') => match params.parse::<u32>() {
            Ok(2) => NamedKey::Insert,
            Ok(3) => NamedKey::Delete,
            Ok(5) => NamedKey::PageUp,
            Ok(6) => NamedKey::PageDown,
            Ok(15) => NamedKey::F5,
            Ok(17) => NamedKey::F6,
            Ok(18) => NamedKey::F7,
            Ok(19) => NamedKey::F8,
            Ok(20) => NamedKey::F9,
            Ok(21) => NamedKey::F10,
            Ok(23) => NamedKey::F11,
            Ok(24) => NamedKey::F12,
            _ => NamedKey::Unknown,
        },
        _ => NamedKey::Unknown,
    }
}

/// Expected sequence length for a UTF-8 lead byte; `None` for bytes that
/// cannot start a rune.
fn utf8_sequence_len(byte: u8) -> Option<usize> {
    match byte {
        0x00..=0x7f => Some(1),
        0xc0..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf7 => Some(4),
        _ => None,
    }
}

fn take_complete_rune(partial: &mut Vec<u8>) -> Option<char> {
    let &lead = partial.first()?;
    let Some(want) = utf8_sequence_len(lead) else {
        partial.clear();
        return Some(char::REPLACEMENT_CHARACTER);
    };
    if partial.len() < want {
        return None;
    }
    let r = std::str::from_utf8(partial)
        .ok()
        .and_then(|s| s.chars().next())
        .unwrap_or(char::REPLACEMENT_CHARACTER);
    partial.clear();
    Some(r)
}

/// Spawn the task that owns the byte source and feeds decoded keys into
/// `sender`. The channel closes (read as end of input by the editor) when
/// the source is exhausted; read failures are forwarded through the channel
/// before the task exits.
pub fn spawn_decoder_task(
    source: PinnedByteSource,
    sender: mpsc::Sender<io::Result<Key>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut decoder = KeyDecoder::new(source);
        loop {
            match decoder.next_key().await {
                Ok(Some(key)) => {
                    if sender.send(Ok(key)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    tracing::debug!(%err, "terminal read failed");
                    let _ = sender.send(Err(err)).await;
                    break;
                }
            }
        }
    })
}
