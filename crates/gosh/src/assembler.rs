//! Block assembly from key events
//!
//! The assembler owns the in-progress line and the committed lines of the
//! current block. It decides when a block is complete:
//!
//! - a newline completes the block once `{`/`}` and `(`/`)` are balanced
//!   across everything typed so far;
//! - a hard-submit completes it regardless of balance;
//! - a reserved command word typed alone on the first line of a fresh block is
//!   returned as a [`Builtin`] without balance checking.
//!
//! Braces and parentheses inside string literals or comments are counted like
//! any other; the heuristic does no lexical analysis.

use std::fmt;

use crate::input::KeyEvent;

/// Spaces inserted for a tab key.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Reserved command words recognised at the start of a fresh block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    /// Show the command list and usage
    Help,
    /// Show every block attempted in this session
    History,
    /// Clear history and the session workspace
    Clear,
    /// Show workspace locations and the session ID
    Workspace,
    /// Rebuild interpreter state by replaying the session
    Reload,
    /// Leave the shell
    Exit,
    /// Leave the shell
    Quit,
}

impl Builtin {
    /// All commands, in help order.
    pub const ALL: [Builtin; 7] = [
        Builtin::Help,
        Builtin::History,
        Builtin::Clear,
        Builtin::Workspace,
        Builtin::Reload,
        Builtin::Exit,
        Builtin::Quit,
    ];

    /// Look up a command by its exact name.
    pub fn parse(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|b| b.name() == word)
    }

    /// The word that invokes this command.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Help => "help",
            Builtin::History => "history",
            Builtin::Clear => "clear",
            Builtin::Workspace => "workspace",
            Builtin::Reload => "reload",
            Builtin::Exit => "exit",
            Builtin::Quit => "quit",
        }
    }

    /// One-line description for the help text.
    pub fn description(self) -> &'static str {
        match self {
            Builtin::Help => "Show this help message",
            Builtin::History => "Show command history",
            Builtin::Clear => "Clear history and workspace",
            Builtin::Workspace => "Show workspace information",
            Builtin::Reload => "Reload workspace code",
            Builtin::Exit | Builtin::Quit => "Exit the shell (prompts to save as CLI tool)",
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the caller should do after feeding an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Keep reading
    Continue,

    /// A complete, trimmed, non-empty block
    Submit(String),

    /// A reserved command word
    Command(Builtin),

    /// End the session
    Terminate,
}

/// Accumulates key events into code blocks.
///
/// # Example
///
/// ```
/// use gosh::assembler::{BlockAssembler, Directive};
/// use gosh::input::KeyEvent;
///
/// let mut asm = BlockAssembler::new();
/// for c in "if true {".chars() {
///     asm.feed(KeyEvent::Printable(c));
/// }
/// assert_eq!(asm.feed(KeyEvent::Newline), Directive::Continue);
///
/// asm.feed(KeyEvent::Printable('}'));
/// assert_eq!(
///     asm.feed(KeyEvent::Newline),
///     Directive::Submit("if true {\n}".to_string())
/// );
/// ```
#[derive(Debug, Clone)]
pub struct BlockAssembler {
    /// The line being typed
    line: String,

    /// Lines already committed to this block
    lines: Vec<String>,

    /// Text inserted for a tab key
    tab: String,
}

impl Default for BlockAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockAssembler {
    /// Create an empty assembler.
    pub fn new() -> Self {
        Self::with_tab_width(DEFAULT_TAB_WIDTH)
    }

    /// Create an assembler that expands tabs to `width` spaces.
    pub fn with_tab_width(width: usize) -> Self {
        Self {
            line: String::new(),
            lines: Vec::new(),
            tab: " ".repeat(width),
        }
    }

    /// The line being typed.
    pub fn current_line(&self) -> &str {
        &self.line
    }

    /// Lines already committed to this block.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Text inserted for a tab key.
    pub fn tab(&self) -> &str {
        &self.tab
    }

    /// Whether nothing has been typed for this block.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.line.is_empty()
    }

    /// Discard the block in progress.
    pub fn reset(&mut self) {
        self.line.clear();
        self.lines.clear();
    }

    /// Feed one event and report what to do next.
    pub fn feed(&mut self, event: KeyEvent) -> Directive {
        match event {
            KeyEvent::Printable(c) => {
                self.line.push(c);
                Directive::Continue
            }
            KeyEvent::Tab => {
                self.line.push_str(&self.tab);
                Directive::Continue
            }
            KeyEvent::Backspace => {
                self.line.pop();
                Directive::Continue
            }
            KeyEvent::Unknown => Directive::Continue,
            KeyEvent::Cancel => {
                if self.is_empty() {
                    return Directive::Terminate;
                }
                self.reset();
                Directive::Continue
            }
            KeyEvent::EndOfInput => {
                if self.is_empty() {
                    return Directive::Terminate;
                }
                self.complete(true)
            }
            KeyEvent::Newline => self.complete(false),
            KeyEvent::HardSubmit => self.complete(true),
        }
    }

    /// Commit the current line and decide whether the block is done.
    fn complete(&mut self, force: bool) -> Directive {
        if self.lines.is_empty() {
            if let Some(cmd) = Builtin::parse(self.line.trim()) {
                self.reset();
                return Directive::Command(cmd);
            }
        }

        self.lines.push(std::mem::take(&mut self.line));

        if self.lines.iter().all(|l| l.trim().is_empty()) {
            self.reset();
            return Directive::Continue;
        }

        if force || self.is_balanced() {
            self.take_block()
        } else {
            Directive::Continue
        }
    }

    /// Whether every opened brace and paren has been closed.
    fn is_balanced(&self) -> bool {
        let mut braces: i64 = 0;
        let mut parens: i64 = 0;
        for c in self.lines.iter().flat_map(|l| l.chars()).chain(self.line.chars()) {
            match c {
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                _ => {}
            }
        }
        braces <= 0 && parens <= 0
    }

    fn take_block(&mut self) -> Directive {
        let text = self.lines.join("\n");
        self.reset();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            Directive::Continue
        } else {
            Directive::Submit(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_str(asm: &mut BlockAssembler, text: &str) {
        for c in text.chars() {
            assert_eq!(asm.feed(KeyEvent::Printable(c)), Directive::Continue);
        }
    }

    #[test]
    fn test_builtin_names_round_trip() {
        for cmd in Builtin::ALL {
            assert_eq!(Builtin::parse(cmd.name()), Some(cmd));
        }
        assert_eq!(Builtin::parse("helpme"), None);
        assert_eq!(Builtin::parse("Help"), None);
    }

    #[test]
    fn test_balanced_line_submits() {
        let mut asm = BlockAssembler::new();
        type_str(&mut asm, "a()");
        assert_eq!(asm.feed(KeyEvent::Newline), Directive::Submit("a()".into()));
        assert!(asm.is_empty());
    }

    #[test]
    fn test_open_paren_waits() {
        let mut asm = BlockAssembler::new();
        type_str(&mut asm, "fmt.Println(");
        assert_eq!(asm.feed(KeyEvent::Newline), Directive::Continue);
        type_str(&mut asm, "1)");
        assert_eq!(
            asm.feed(KeyEvent::Newline),
            Directive::Submit("fmt.Println(\n1)".into())
        );
    }

    #[test]
    fn test_backspace_stays_on_line() {
        let mut asm = BlockAssembler::new();
        type_str(&mut asm, "ab");
        asm.feed(KeyEvent::Backspace);
        asm.feed(KeyEvent::Backspace);
        asm.feed(KeyEvent::Backspace);
        assert_eq!(asm.current_line(), "");
    }

    #[test]
    fn test_tab_expands() {
        let mut asm = BlockAssembler::with_tab_width(2);
        asm.feed(KeyEvent::Tab);
        assert_eq!(asm.current_line(), "  ");
    }
}
