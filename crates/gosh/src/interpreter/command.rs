//! Process-backed interpreter
//!
//! [`CommandInterpreter`] keeps a transcript of the fragments it has accepted
//! and evaluates a new fragment by running an external program (`yaegi` by
//! default) on the transcript plus that fragment, fed through stdin. A zero
//! exit status accepts the fragment.
//!
//! Every call re-runs the whole transcript, so side effects of earlier
//! fragments repeat on each evaluation. Only the stdout produced beyond the
//! previous accepted run is reported back.

use std::io::{ErrorKind, Write};
use std::process::{Command, Output, Stdio};
use std::thread;

use tracing::{debug, warn};

use super::{Evaluation, Interpreter, InterpreterFactory};
use crate::error::EvalError;

/// Program run when none is configured.
pub const DEFAULT_PROGRAM: &str = "yaegi";

/// Fragment every fresh transcript starts with.
pub const DEFAULT_PRELUDE: &str = "import \"fmt\"";

/// How to launch the external interpreter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute
    pub program: String,

    /// Arguments passed before the program reads stdin
    pub args: Vec<String>,

    /// Fragments seeded into every fresh transcript
    pub prelude: Vec<String>,
}

impl Default for CommandSpec {
    fn default() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
            args: Vec::new(),
            prelude: vec![DEFAULT_PRELUDE.to_string()],
        }
    }
}

impl CommandSpec {
    /// Run `program` with no arguments and no prelude.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            prelude: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a prelude fragment.
    pub fn with_prelude(mut self, fragment: impl Into<String>) -> Self {
        self.prelude.push(fragment.into());
        self
    }
}

/// An interpreter session backed by repeated runs of an external program.
#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    spec: CommandSpec,
    transcript: Vec<String>,
    last_stdout: String,
}

impl CommandInterpreter {
    /// Start a session whose transcript holds only the prelude.
    pub fn new(spec: CommandSpec) -> Self {
        let transcript = spec.prelude.clone();
        Self {
            spec,
            transcript,
            last_stdout: String::new(),
        }
    }

    /// Fragments accepted so far, prelude first.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    fn program_text(&self, fragment: &str) -> String {
        let mut text = String::new();
        for part in self.transcript.iter().map(String::as_str).chain([fragment]) {
            text.push_str(part);
            text.push_str("\n\n");
        }
        text
    }

    fn run(&self, text: &str) -> Result<Output, EvalError> {
        let spawn_err = |source| EvalError::Spawn {
            program: self.spec.program.clone(),
            source,
        };

        let mut child = Command::new(&self.spec.program)
            .args(&self.spec.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        let stdin = child.stdin.take();
        let output = thread::scope(|scope| {
            // Feed stdin concurrently so a chatty child cannot fill its pipes
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(text.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            match writer.join() {
                Ok(Ok(())) => {}
                // A child that exits without reading everything closes the pipe
                Ok(Err(err)) if err.kind() == ErrorKind::BrokenPipe => {
                    debug!("interpreter closed stdin early: {err}");
                }
                Ok(Err(err)) => warn!("failed to write program to interpreter: {err}"),
                Err(_) => warn!("interpreter stdin writer panicked"),
            }
            output
        });
        output.map_err(spawn_err)
    }
}

impl Interpreter for CommandInterpreter {
    fn eval(&mut self, source: &str) -> Result<Evaluation, EvalError> {
        let output = self.run(&self.program_text(source))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match stderr.trim() {
                "" => format!("{} exited with {}", self.spec.program, output.status),
                text => text.to_string(),
            };
            debug!(program = %self.spec.program, "fragment rejected");
            return Err(EvalError::rejected(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let fresh = stdout
            .strip_prefix(self.last_stdout.as_str())
            .unwrap_or(&stdout)
            .to_string();
        self.last_stdout = stdout;
        self.transcript.push(source.to_string());
        Ok(Evaluation::new(fresh))
    }
}

/// Creates [`CommandInterpreter`]s from one [`CommandSpec`].
#[derive(Debug, Clone, Default)]
pub struct CommandFactory {
    spec: CommandSpec,
}

impl CommandFactory {
    /// A factory for `spec`.
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

impl InterpreterFactory for CommandFactory {
    type Interpreter = CommandInterpreter;

    fn create(&self) -> Result<CommandInterpreter, EvalError> {
        Ok(CommandInterpreter::new(self.spec.clone()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn shell() -> CommandInterpreter {
        CommandInterpreter::new(CommandSpec::new("sh"))
    }

    #[test]
    fn test_reports_only_new_output() {
        let mut interp = shell();
        assert_eq!(interp.eval("echo one").unwrap().output, "one\n");
        assert_eq!(interp.eval("echo two").unwrap().output, "two\n");
        assert_eq!(interp.transcript(), ["echo one", "echo two"]);
    }

    #[test]
    fn test_failure_keeps_transcript() {
        let mut interp = shell();
        interp.eval("X=1").unwrap();
        let err = interp.eval("echo nope >&2; exit 3").unwrap_err();
        assert_eq!(err.to_string(), "nope");
        assert_eq!(interp.transcript(), ["X=1"]);
    }

    #[test]
    fn test_silent_failure_mentions_status() {
        let mut interp = shell();
        let err = interp.eval("exit 4").unwrap_err();
        assert!(err.to_string().starts_with("sh exited with"));
    }

    #[test]
    fn test_state_carries_across_calls() {
        let mut interp = shell();
        interp.eval("X=42").unwrap();
        assert_eq!(interp.eval("echo $X").unwrap().output, "42\n");
    }

    #[test]
    fn test_child_ignoring_stdin_is_accepted() {
        // Larger than a pipe buffer, so the writer hits a closed pipe
        let mut interp = CommandInterpreter::new(CommandSpec::new("true"));
        let fragment = "x".repeat(1 << 20);
        assert_eq!(interp.eval(&fragment).unwrap().output, "");
        assert_eq!(interp.transcript().len(), 1);
    }

    #[test]
    fn test_missing_program() {
        let mut interp = CommandInterpreter::new(CommandSpec::new("gosh-no-such-interpreter"));
        assert!(matches!(interp.eval("x"), Err(EvalError::Spawn { .. })));
    }

    #[test]
    fn test_default_spec_has_fmt_prelude() {
        let interp = CommandFactory::default().create().unwrap();
        assert_eq!(interp.transcript(), [DEFAULT_PRELUDE]);
    }
}
