//! gosh command line entry point

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use gosh::interpreter::{CommandFactory, CommandSpec, DEFAULT_PROGRAM};
use gosh::signal::{self, ExitLatch};
use gosh::{Config, Console, Ended, EvaluatorGate, Session, SharedSession, Shell, Workspace};

#[derive(Parser, Debug)]
#[command(name = "gosh")]
#[command(about = "Interactive Go shell that keeps only code that compiles")]
#[command(version)]
struct Args {
    /// Workspace directory [default: ~/.gosh]
    #[arg(short, long, value_name = "DIR", env = "GOSH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Go interpreter that reads a program on stdin
    #[arg(long, value_name = "PROGRAM", env = "GOSH_INTERPRETER", default_value = DEFAULT_PROGRAM)]
    interpreter: String,

    /// Extra argument for the interpreter (repeatable)
    #[arg(long = "interpreter-arg", value_name = "ARG", allow_hyphen_values = true)]
    interpreter_args: Vec<String>,

    /// Do not seed the interpreter with `import "fmt"`
    #[arg(long)]
    no_prelude: bool,

    /// Read input line by line even on a terminal
    #[arg(long)]
    line_mode: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let config = match self.workspace {
            Some(root) => Config::new(root),
            None => Config::from_home().context("failed to locate the default workspace")?,
        };

        let mut spec = if self.no_prelude {
            CommandSpec::new(self.interpreter)
        } else {
            CommandSpec {
                program: self.interpreter,
                ..CommandSpec::default()
            }
        };
        for arg in self.interpreter_args {
            spec = spec.with_arg(arg);
        }

        Ok(config
            .with_interpreter(spec)
            .with_line_mode(self.line_mode))
    }
}

fn init_tracing(verbose: bool) {
    // RUST_LOG=gosh=trace overrides the flag
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.into_config()?;
    debug!(?config, "starting");

    let workspace = Workspace::open(&config.workspace_root).with_context(|| {
        format!(
            "failed to initialize workspace at {}",
            config.workspace_root.display()
        )
    })?;
    let session = Session::create(&workspace).context("failed to start session")?;
    let session = SharedSession::new(session);
    let gate = EvaluatorGate::new(CommandFactory::new(config.interpreter.clone()))
        .context("failed to start interpreter")?;

    let console = Console::stdio(config.line_mode);
    let latch = ExitLatch::new();
    let watcher = signal::spawn_watcher(session.clone(), latch.clone(), console.owns_terminal())
        .context("failed to install signal handlers")?;

    let mut shell = Shell::new(console, gate, session)
        .with_latch(latch)
        .with_tab_width(config.tab_width);

    match shell.run()? {
        Ended::Finished => Ok(()),
        Ended::Interrupted => {
            // The watcher owns termination and exits the process
            if watcher.join().is_err() {
                warn!("signal watcher panicked");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["gosh", "--workspace", "/tmp/ws"]).unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(config.workspace_root, PathBuf::from("/tmp/ws"));
        assert_eq!(config.interpreter, CommandSpec::default());
        assert!(!config.line_mode);
    }

    #[test]
    fn test_args_interpreter_overrides() {
        let args = Args::try_parse_from([
            "gosh",
            "-w",
            "/w",
            "--interpreter",
            "gointerp",
            "--interpreter-arg",
            "-x",
            "--interpreter-arg",
            "run",
            "--no-prelude",
            "--line-mode",
        ])
        .unwrap();
        let config = args.into_config().unwrap();
        assert_eq!(
            config.interpreter,
            CommandSpec::new("gointerp").with_arg("-x").with_arg("run")
        );
        assert!(config.line_mode);
    }
}
