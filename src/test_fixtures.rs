// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Shared mocks for unit tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// In-memory stand-in for the raw terminal writer. Clones share one buffer,
/// so the copy handed to the editor and the copy kept by the test observe
/// the same bytes.
#[derive(Clone, Default)]
pub struct StdoutMock {
    pub buffer: Arc<Mutex<Vec<u8>>>,
}

impl StdoutMock {
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().unwrap().clone()
    }

    /// The captured output with ANSI sequences removed.
    pub fn contents_stripped(&self) -> String {
        String::from_utf8(strip_ansi_escapes::strip(self.contents())).expect("utf8")
    }
}

impl Write for StdoutMock {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
