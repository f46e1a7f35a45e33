//! Raw keystroke capture
//!
//! This module turns the terminal byte stream into [`KeyEvent`]s and drives a
//! [`BlockAssembler`](crate::assembler::BlockAssembler) until a block or a
//! control directive is ready.
//!
//! Two modes exist:
//!
//! - **Interactive**: the terminal is put in raw mode for the duration of one
//!   block read; every byte is decoded immediately and the console echoes
//!   input and prompts itself.
//! - **Piped**: stdin is not a terminal (or raw mode is unavailable); input is
//!   read a line at a time and an empty line is the submit signal.

mod console;
mod decoder;

pub use console::{Console, EditorPrompt, InputMode, RawModeGuard};
pub use decoder::KeyDecoder;

use std::io;

/// Prompt shown at the start of a fresh block.
pub const PROMPT: &str = "gosh> ";

/// Prompt shown for continuation lines of an open block.
pub const CONTINUATION: &str = "...  ";

/// One classified keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// A printable character
    Printable(char),

    /// Commit the current line
    Newline,

    /// Force completion of the block regardless of balance
    HardSubmit,

    /// Ctrl+C
    Cancel,

    /// Ctrl+D or end of the input stream
    EndOfInput,

    /// Erase the previous character
    Backspace,

    /// Indent
    Tab,

    /// Anything else: stray control bytes, escape sequences, bad UTF-8
    Unknown,
}

/// A source of single-line answers, used by the exit prompt protocol.
pub trait LinePrompt {
    /// Show `prompt` and read one line.
    ///
    /// Returns `Ok(None)` when the input is exhausted or the user aborted.
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// A prompt that never has an answer.
///
/// Used where nobody can be asked, e.g. from the signal watcher while the
/// main loop owns a piped stdin.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl LinePrompt for NoPrompt {
    fn prompt_line(&mut self, _prompt: &str) -> io::Result<Option<String>> {
        Ok(None)
    }
}
