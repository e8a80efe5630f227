// SPDX-License-Identifier: Apache-2.0

//! Per-command mutation context.

use crate::hooks::Effect;

/// Scratch state threaded through one command's mutator: output lines,
/// deferred effects, and feed previews. Lives and dies inside a single
/// transaction.
#[derive(Debug)]
pub struct CmdCtx<'a> {
    /// Operation id supplied by the caller.
    pub op_id: &'a str,
    /// RFC 3339 instant pinned for the whole command.
    pub now_iso: String,
    /// Epoch milliseconds pinned for the whole command.
    pub now_millis: i64,
    /// Output lines returned to the caller.
    pub lines: Vec<String>,
    /// Deferred post-commit effects.
    pub effects: Vec<Effect>,
    /// First chronicle line this command produced, if any.
    pub chronicle_preview: Option<String>,
    /// First news line this command produced, if any.
    pub news_preview: Option<String>,
}

impl<'a> CmdCtx<'a> {
    /// Fresh context for one command.
    #[must_use]
    pub fn new(op_id: &'a str, now_iso: String, now_millis: i64) -> Self {
        Self {
            op_id,
            now_iso,
            now_millis,
            lines: Vec::new(),
            effects: Vec::new(),
            chronicle_preview: None,
            news_preview: None,
        }
    }

    /// Emit an output line.
    pub fn say(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Defer a post-commit effect.
    pub fn effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    /// Emit a diagnostic line and report the command as not applied.
    /// Reads naturally at validation sites: `return ctx.refuse("…");`
    pub fn refuse(&mut self, line: impl Into<String>) -> bool {
        self.lines.push(line.into());
        false
    }
}
