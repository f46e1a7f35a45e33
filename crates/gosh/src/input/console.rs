//! Terminal-facing reader: raw mode, echo, and prompts

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Stdin, StdinLock, Stdout, Write};

use crossterm::terminal;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use super::{KeyDecoder, KeyEvent, LinePrompt, CONTINUATION, PROMPT};
use crate::assembler::{BlockAssembler, Directive};

/// How input is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Raw, unechoed, byte-at-a-time
    Interactive,
    /// Line-buffered; an empty line submits
    Piped,
}

/// Keeps the terminal in raw mode while alive.
///
/// Dropping the guard restores the previous mode, so every exit path of a
/// read loop (return, `?`, unwinding) leaves the terminal usable.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Switch the terminal to raw mode.
    pub fn acquire() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(err) = terminal::disable_raw_mode() {
            warn!("failed to restore terminal mode: {err}");
        }
    }
}

/// Line prompts backed by a rustyline editor.
///
/// The editor reads the terminal directly and manages its own terminal mode,
/// so it is usable from any thread while the main loop is not reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct EditorPrompt;

impl LinePrompt for EditorPrompt {
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        let mut editor = DefaultEditor::new().map_err(readline_to_io)?;
        match editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(err) => Err(readline_to_io(err)),
        }
    }
}

fn readline_to_io(err: ReadlineError) -> io::Error {
    match err {
        ReadlineError::Io(err) => err,
        other => io::Error::other(other.to_string()),
    }
}

/// Reads key events and renders the input side of the shell.
///
/// In interactive mode the console owns echo: the terminal no longer prints
/// what the user types, so printable characters, backspace erasure and the
/// `gosh> ` / `...  ` prompts are written here.
pub struct Console<R, W> {
    input: R,
    output: W,
    mode: InputMode,

    /// Whether this console toggles the real terminal's raw mode
    manage_terminal: bool,

    decoder: KeyDecoder,
    pending: VecDeque<KeyEvent>,
}

impl Console<StdinLock<'static>, Stdout> {
    /// A console on the process's stdin and stdout.
    ///
    /// Interactive mode is chosen when stdin is a terminal and
    /// `force_line_mode` is false.
    pub fn stdio(force_line_mode: bool) -> Self {
        let stdin: Stdin = io::stdin();
        let interactive = !force_line_mode && stdin.is_terminal();
        let mode = if interactive {
            InputMode::Interactive
        } else {
            InputMode::Piped
        };
        debug!(?mode, "console attached to stdio");
        let mut console = Console::new(stdin.lock(), io::stdout(), mode);
        console.manage_terminal = interactive;
        console
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// A console over arbitrary streams.
    ///
    /// The real terminal is never touched; interactive mode only changes how
    /// bytes are decoded and echoed.
    pub fn new(input: R, output: W, mode: InputMode) -> Self {
        Self {
            input,
            output,
            mode,
            manage_terminal: false,
            decoder: KeyDecoder::new(),
            pending: VecDeque::new(),
        }
    }

    /// Current input mode.
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Whether the console is attached to a real terminal.
    pub fn owns_terminal(&self) -> bool {
        self.manage_terminal
    }

    /// Consume the console, returning its streams.
    pub fn into_parts(self) -> (R, W) {
        (self.input, self.output)
    }

    /// Read the next key event, blocking.
    pub fn next_event(&mut self) -> io::Result<KeyEvent> {
        match self.mode {
            InputMode::Interactive => self.next_raw_event(),
            InputMode::Piped => self.next_line_event(),
        }
    }

    /// Read events into `assembler` until it yields something other than
    /// [`Directive::Continue`].
    pub fn read_block(&mut self, assembler: &mut BlockAssembler) -> io::Result<Directive> {
        self.write_flush(PROMPT)?;

        let _guard = if self.mode == InputMode::Interactive && self.manage_terminal {
            match RawModeGuard::acquire() {
                Ok(guard) => Some(guard),
                Err(err) => {
                    warn!("raw mode unavailable, falling back to line input: {err}");
                    self.mode = InputMode::Piped;
                    self.manage_terminal = false;
                    None
                }
            }
        } else {
            None
        };

        loop {
            let event = self.next_event()?;
            let line_was_empty = assembler.current_line().is_empty();
            let directive = assembler.feed(event);
            self.render(event, &directive, line_was_empty, assembler)?;
            if directive != Directive::Continue {
                return Ok(directive);
            }
        }
    }

    fn next_raw_event(&mut self) -> io::Result<KeyEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(event);
            }
            match self.read_byte()? {
                Some(byte) => self.decoder.feed(byte, &mut self.pending),
                None => {
                    if !self.decoder.is_idle() {
                        self.decoder = KeyDecoder::new();
                    }
                    return Ok(KeyEvent::EndOfInput);
                }
            }
        }
    }

    fn next_line_event(&mut self) -> io::Result<KeyEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(event);
        }

        let Some(line) = self.read_raw_line()? else {
            return Ok(KeyEvent::EndOfInput);
        };
        match String::from_utf8(line) {
            Ok(text) => {
                if text.trim().is_empty() {
                    return Ok(KeyEvent::HardSubmit);
                }
                self.pending.extend(text.chars().map(KeyEvent::Printable));
            }
            Err(err) => {
                // Undecodable bytes are dropped like stray keys
                debug!("invalid UTF-8 on input: {err}");
                let text = String::from_utf8_lossy(err.as_bytes());
                self.pending.extend(text.chars().map(|c| match c {
                    char::REPLACEMENT_CHARACTER => KeyEvent::Unknown,
                    c => KeyEvent::Printable(c),
                }));
            }
        }
        self.pending.push_back(KeyEvent::Newline);
        Ok(self.pending.pop_front().unwrap_or(KeyEvent::Newline))
    }

    /// One input line without its terminator, or `None` at end of stream.
    fn read_raw_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        while matches!(line.last(), Some(b'\n' | b'\r')) {
            line.pop();
        }
        Ok(Some(line))
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        loop {
            let byte = match self.input.fill_buf() {
                Ok(buf) => buf.first().copied(),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            };
            if byte.is_some() {
                self.input.consume(1);
            }
            return Ok(byte);
        }
    }

    fn render(
        &mut self,
        event: KeyEvent,
        directive: &Directive,
        line_was_empty: bool,
        assembler: &BlockAssembler,
    ) -> io::Result<()> {
        let interactive = self.mode == InputMode::Interactive;
        let newline = if interactive { "\r\n" } else { "" };

        match (event, directive) {
            (KeyEvent::Printable(c), Directive::Continue) if interactive => {
                let mut buf = [0; 4];
                self.output.write_all(c.encode_utf8(&mut buf).as_bytes())?;
            }
            (KeyEvent::Tab, Directive::Continue) if interactive => {
                self.output.write_all(assembler.tab().as_bytes())?;
            }
            (KeyEvent::Backspace, _) if interactive && !line_was_empty => {
                self.output.write_all(b"\x08 \x08")?;
            }
            (KeyEvent::Cancel, Directive::Continue) => {
                write!(self.output, "^C{newline}{PROMPT}")?;
            }
            (KeyEvent::Cancel, Directive::Terminate) => {
                write!(self.output, "^C{newline}")?;
            }
            (KeyEvent::EndOfInput, Directive::Terminate) if interactive => {
                write!(self.output, "^D{newline}")?;
            }
            (KeyEvent::Newline | KeyEvent::HardSubmit, Directive::Continue) => {
                let prompt = if assembler.is_empty() {
                    PROMPT
                } else {
                    CONTINUATION
                };
                write!(self.output, "{newline}{prompt}")?;
            }
            (_, Directive::Submit(_) | Directive::Command(_)) => {
                self.output.write_all(newline.as_bytes())?;
            }
            _ => {}
        }
        self.output.flush()
    }

    fn write_flush(&mut self, text: &str) -> io::Result<()> {
        self.output.write_all(text.as_bytes())?;
        self.output.flush()
    }
}

impl<R: BufRead, W: Write> LinePrompt for Console<R, W> {
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if self.manage_terminal {
            return EditorPrompt.prompt_line(prompt);
        }

        self.write_flush(prompt)?;
        Ok(self
            .read_raw_line()?
            .map(|line| String::from_utf8_lossy(&line).into_owned()))
    }
}

impl<R: BufRead, W: Write> Write for Console<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn piped(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new(), InputMode::Piped)
    }

    #[test]
    fn test_piped_line_events() {
        let mut console = piped("ab\n\n");
        assert_eq!(console.next_event().unwrap(), KeyEvent::Printable('a'));
        assert_eq!(console.next_event().unwrap(), KeyEvent::Printable('b'));
        assert_eq!(console.next_event().unwrap(), KeyEvent::Newline);
        assert_eq!(console.next_event().unwrap(), KeyEvent::HardSubmit);
        assert_eq!(console.next_event().unwrap(), KeyEvent::EndOfInput);
    }

    #[test]
    fn test_piped_crlf_lines() {
        let mut console = piped("x\r\n");
        assert_eq!(console.next_event().unwrap(), KeyEvent::Printable('x'));
        assert_eq!(console.next_event().unwrap(), KeyEvent::Newline);
    }

    #[test]
    fn test_piped_invalid_utf8_is_unknown() {
        let mut console = Console::new(
            Cursor::new(vec![b'a', 0xff, b'\n']),
            Vec::new(),
            InputMode::Piped,
        );
        assert_eq!(console.next_event().unwrap(), KeyEvent::Printable('a'));
        assert_eq!(console.next_event().unwrap(), KeyEvent::Unknown);
        assert_eq!(console.next_event().unwrap(), KeyEvent::Newline);
        assert_eq!(console.next_event().unwrap(), KeyEvent::EndOfInput);
    }

    #[test]
    fn test_prompt_line_reads_answer() {
        let mut console = piped("yes\n");
        assert_eq!(console.prompt_line("? ").unwrap(), Some("yes".to_string()));
        assert_eq!(console.prompt_line("? ").unwrap(), None);
        let (_, out) = console.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "? ? ");
    }
}
