// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! The degenerate non-editing mode: print the prompt, read one line.
//!
//! Used when `TERM` names a terminal that cannot do cursor addressing. The
//! terminal stays in canonical mode (it echoes and line-buffers by itself),
//! so all that is left to do is collect runes until a line terminator.

use crate::{Key, PromptError, SafeRawTerminal};
use std::io::{self, Write as _};
use tokio::sync::mpsc;

pub(crate) async fn read_plain_line(
    prompt: &str,
    out: &SafeRawTerminal,
    keys: &mut mpsc::Receiver<io::Result<Key>>,
) -> Result<String, PromptError> {
    {
        let mut out = out.lock().unwrap();
        write!(out, "{prompt}")?;
        out.flush()?;
    }
    let mut line = String::new();
    loop {
        match keys.recv().await {
            Some(Ok(Key::Rune('\r' | '\n'))) => return Ok(line.trim().to_owned()),
            Some(Ok(Key::Rune(r))) if !r.is_control() => line.push(r),
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err.into()),
            None => {
                if line.is_empty() {
                    return Err(PromptError::Eof);
                }
                return Ok(line.trim().to_owned());
            }
        }
    }
}
