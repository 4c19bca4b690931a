// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

/// Terminal capabilities derived from the `TERM` environment variable.
///
/// Only a tiny allow-list is consulted; there is no terminfo parsing. Two
/// facts matter to the editor:
/// - whether the terminal supports line editing at all, and
/// - whether it understands the CHA (`ESC [ n G`) cursor-positioning opcode.
///
/// ## Examples
///
/// ```
/// use promptline::TermCaps;
///
/// assert!(!TermCaps::from_term(Some("dumb")).supported);
/// assert!(TermCaps::from_term(Some("xterm-256color")).use_cha);
/// assert!(!TermCaps::from_term(Some("vt100")).use_cha);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCaps {
    /// False for terminals that cannot do cursor addressing; the editor then
    /// falls back to a plain line read.
    pub supported: bool,

    /// True when cursor positioning may use CHA. Everything else gets the
    /// conservative `CR` + `ESC [ n C` pair.
    pub use_cha: bool,
}

impl TermCaps {
    #[must_use]
    pub fn detect() -> Self {
        let term = std::env::var("TERM").ok();
        Self::from_term(term.as_deref())
    }

    #[must_use]
    pub fn from_term(term: Option<&str>) -> Self {
        let term = term.unwrap_or("").to_ascii_lowercase();
        let supported = !(term.is_empty() || term == "dumb" || term == "cons25");
        let use_cha = term.contains("xterm");
        Self { supported, use_cha }
    }
}
