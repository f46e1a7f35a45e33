//! The interactive loop
//!
//! [`Shell`] reads blocks from a [`Console`], dispatches reserved commands,
//! and sends everything else through the [`EvaluatorGate`]. When the session
//! ends it runs the exit prompt protocol, offering to turn the session into a
//! CLI tool.

use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use tracing::{debug, info};

use crate::assembler::{BlockAssembler, Builtin, Directive};
use crate::emitter::ToolEmitter;
use crate::error::{GateError, Result};
use crate::gate::EvaluatorGate;
use crate::input::{Console, InputMode, LinePrompt};
use crate::interpreter::InterpreterFactory;
use crate::signal::ExitLatch;
use crate::workspace::SharedSession;

/// Key that forces early execution, as shown to the user.
pub const SUBMIT_KEY: &str = "Ctrl+J";

/// How a shell run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ended {
    /// The shell ran the termination path itself
    Finished,
    /// The signal watcher claimed termination; it will exit the process
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Exit,
}

// ═══════════════════════════════════════════════════════════════════════
// SHELL
// ═══════════════════════════════════════════════════════════════════════

/// The read-evaluate-persist loop.
pub struct Shell<F: InterpreterFactory, R, W> {
    console: Console<R, W>,
    assembler: BlockAssembler,
    gate: EvaluatorGate<F>,
    session: SharedSession,

    /// Every block submitted this session, accepted or not
    history: Vec<String>,

    latch: ExitLatch,
}

impl<F, R, W> Shell<F, R, W>
where
    F: InterpreterFactory,
    R: BufRead,
    W: Write,
{
    /// Assemble a shell.
    pub fn new(console: Console<R, W>, gate: EvaluatorGate<F>, session: SharedSession) -> Self {
        Self {
            console,
            assembler: BlockAssembler::new(),
            gate,
            session,
            history: Vec::new(),
            latch: ExitLatch::new(),
        }
    }

    /// Share termination with a signal watcher holding the same latch.
    pub fn with_latch(mut self, latch: ExitLatch) -> Self {
        self.latch = latch;
        self
    }

    /// Expand tabs to `width` spaces.
    pub fn with_tab_width(mut self, width: usize) -> Self {
        self.assembler = BlockAssembler::with_tab_width(width);
        self
    }

    /// The session being built.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Every submitted block, accepted or not.
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// The evaluator gate.
    pub fn gate(&self) -> &EvaluatorGate<F> {
        &self.gate
    }

    /// Consume the shell, returning its console.
    pub fn into_console(self) -> Console<R, W> {
        self.console
    }

    /// Run until the user leaves, then offer to generate a CLI tool.
    pub fn run(&mut self) -> Result<Ended> {
        self.print_banner()?;

        loop {
            if !self.latch.enter_read() {
                return Ok(Ended::Interrupted);
            }
            let directive = self.console.read_block(&mut self.assembler);
            self.latch.leave_read();

            match directive? {
                Directive::Continue => {}
                Directive::Terminate => {
                    if self.console.mode() == InputMode::Piped {
                        writeln!(self.console)?;
                    }
                    break;
                }
                Directive::Command(cmd) => {
                    if self.handle_builtin(cmd)? == Flow::Exit {
                        break;
                    }
                }
                Directive::Submit(code) => self.submit(&code)?,
            }
        }

        self.finish()
    }

    /// Evaluate one block and report the outcome.
    pub fn submit(&mut self, code: &str) -> Result<()> {
        self.history.push(code.to_string());

        match self.gate.try_eval(code, &mut self.session) {
            Ok(evaluation) => {
                if !evaluation.output.is_empty() {
                    self.console.write_all(evaluation.output.as_bytes())?;
                    if !evaluation.output.ends_with('\n') {
                        writeln!(self.console)?;
                    }
                }
                writeln!(self.console, "✓ Code compiled and added to project")?;
            }
            Err(GateError::Persist(err)) => {
                writeln!(self.console, "Warning: failed to save code: {err}")?;
            }
            Err(err) => {
                writeln!(self.console, "Error: {err}")?;
                writeln!(self.console, "Code not added to project. Fix and try again.")?;
            }
        }
        self.console.flush()?;
        Ok(())
    }

    fn handle_builtin(&mut self, cmd: Builtin) -> Result<Flow> {
        debug!(command = %cmd, "builtin");
        match cmd {
            Builtin::Exit | Builtin::Quit => return Ok(Flow::Exit),
            Builtin::Help => write!(self.console, "{}", HelpText)?,
            Builtin::History => self.print_history()?,
            Builtin::Clear => {
                self.history.clear();
                match self.session.lock().clear() {
                    Ok(()) => writeln!(self.console, "History and workspace cleared")?,
                    Err(err) => writeln!(self.console, "Error clearing workspace: {err}")?,
                }
            }
            Builtin::Workspace => {
                let (root, internal, id) = {
                    let session = self.session.lock();
                    let workspace = session.workspace();
                    (
                        workspace.root().to_path_buf(),
                        workspace.internal_dir(),
                        session.id().clone(),
                    )
                };
                writeln!(self.console, "Workspace directory: {}", root.display())?;
                writeln!(self.console, "Internal directory: {}", internal.display())?;
                writeln!(self.console, "Session ID: {id}")?;
            }
            Builtin::Reload => match self.gate.reload(&self.session) {
                Ok(count) => {
                    info!(blocks = count, "workspace reloaded");
                    writeln!(self.console, "Workspace reloaded successfully")?;
                }
                Err(err) => writeln!(self.console, "Error reloading workspace: {err}")?,
            },
        }
        self.console.flush()?;
        Ok(Flow::Continue)
    }

    fn print_history(&mut self) -> io::Result<()> {
        if self.history.is_empty() {
            return writeln!(self.console, "No history");
        }
        writeln!(self.console, "Command history:")?;
        for (i, block) in self.history.iter().enumerate() {
            writeln!(self.console, "{:4}  {}", i + 1, block)?;
        }
        Ok(())
    }

    fn print_banner(&mut self) -> io::Result<()> {
        writeln!(self.console, "Welcome to gosh - Go Shell")?;
        writeln!(self.console, "Write multi-line code blocks - press Enter for new lines")?;
        writeln!(self.console, "A block runs once its braces and parentheses balance")?;
        writeln!(self.console, "Press {SUBMIT_KEY} to execute your code block early")?;
        writeln!(self.console, "Type 'help' for commands, 'exit' to quit")?;
        writeln!(self.console)?;
        self.console.flush()
    }

    fn finish(&mut self) -> Result<Ended> {
        if !self.latch.try_claim() {
            return Ok(Ended::Interrupted);
        }
        offer_tool_emission(&mut self.console, &self.session)?;
        self.console.flush()?;
        Ok(Ended::Finished)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// EXIT PROMPT PROTOCOL
// ═══════════════════════════════════════════════════════════════════════

/// A line prompt paired with a separate output stream.
pub struct Split<P, W> {
    prompt: P,
    out: W,
}

impl<P, W> Split<P, W> {
    /// Pair `prompt` with `out`.
    pub fn new(prompt: P, out: W) -> Self {
        Self { prompt, out }
    }
}

impl<P: LinePrompt, W: Write> LinePrompt for Split<P, W> {
    fn prompt_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.out.flush()?;
        self.prompt.prompt_line(prompt)
    }
}

impl<P, W: Write> Write for Split<P, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.out.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Ask whether to save the session as a CLI tool and generate it if so.
///
/// Returns the generated tool directory, if any. An empty session, a "no",
/// an empty name, or unreadable input all skip generation.
pub fn offer_tool_emission<T>(term: &mut T, session: &SharedSession) -> io::Result<Option<PathBuf>>
where
    T: LinePrompt + Write + ?Sized,
{
    let (workspace, id, blocks) = {
        let session = session.lock();
        (
            session.workspace().clone(),
            session.id().clone(),
            session.blocks().to_vec(),
        )
    };

    if blocks.is_empty() {
        writeln!(term, "No code blocks to save. Exiting...")?;
        return Ok(None);
    }

    writeln!(term)?;
    let question = "Would you like to save this session as a CLI tool? (y/n): ";
    let Some(answer) = term.prompt_line(question)? else {
        writeln!(term, "Exiting...")?;
        return Ok(None);
    };

    let mut generated = None;
    if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
        let Some(name) = term.prompt_line("Enter CLI tool name: ")? else {
            writeln!(term, "Exiting...")?;
            return Ok(None);
        };
        let name = name.trim();

        if !name.is_empty() {
            match ToolEmitter::new(&workspace).emit(name, &id, &blocks) {
                Ok(dir) => {
                    writeln!(term, "✓ CLI tool '{name}' generated successfully!")?;
                    writeln!(term, "  Location: {}/", dir.display())?;
                    writeln!(term, "  To build: cd {} && go build", dir.display())?;
                    generated = Some(dir);
                }
                Err(err) => writeln!(term, "Error generating CLI tool: {err}")?,
            }
        }
    }

    writeln!(term, "Exiting gosh...")?;
    Ok(generated)
}

// ═══════════════════════════════════════════════════════════════════════
// HELP
// ═══════════════════════════════════════════════════════════════════════

/// The `help` command output.
pub struct HelpText;

impl fmt::Display for HelpText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gosh - Go Shell Commands:")?;
        for cmd in Builtin::ALL {
            let label = match cmd {
                Builtin::Quit => continue,
                Builtin::Exit => "exit/quit",
                other => other.name(),
            };
            writeln!(f, "  {label:<12}- {}", cmd.description())?;
        }
        writeln!(f)?;
        writeln!(f, "Usage:")?;
        writeln!(f, "  - Type or paste multi-line Go code")?;
        writeln!(f, "  - Press Enter to add new lines within your code block")?;
        writeln!(f, "  - A block runs when its braces and parentheses balance")?;
        writeln!(f, "  - Press {SUBMIT_KEY} (or Ctrl+D) to execute the code block")?;
        writeln!(f, "  - Press Ctrl+C to discard the block being typed")?;
        writeln!(f, "  - On exit, you can save your session as a Cobra-based CLI tool")?;
        writeln!(f)?;
        writeln!(f, "Examples:")?;
        writeln!(f, "  fmt.Println(\"Hello, World!\")")?;
        writeln!(f, "  x := 42")?;
        writeln!(f, "  fmt.Printf(\"x = %d\\n\", x)")
    }
}
