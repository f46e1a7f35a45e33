//! # gosh
//!
//! An interactive Go shell that only keeps code that compiles.
//!
//! Multi-line blocks are assembled from raw keystrokes, evaluated by an
//! external Go interpreter, and persisted to a session file only when the
//! interpreter accepts them. At the end of a session the accepted blocks can
//! be turned into a Cobra-based CLI tool.
//!
//! ## Architecture
//!
//! - **Input**: raw terminal decoding and echo ([`input`])
//! - **Assembler**: keystrokes to blocks, builtins and control directives
//!   ([`assembler`])
//! - **Gate**: evaluate, then persist ([`gate`], [`interpreter`])
//! - **Workspace**: `go.mod`, session files and generated tools
//!   ([`workspace`], [`emitter`])
//! - **Shell**: the loop and the exit prompt ([`shell`], [`signal`])

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod assembler;
pub mod config;
pub mod emitter;
pub mod error;
pub mod gate;
pub mod input;
pub mod interpreter;
pub mod shell;
pub mod signal;
pub mod workspace;

// Re-export main types
pub use assembler::{BlockAssembler, Builtin, Directive};
pub use config::Config;
pub use emitter::ToolEmitter;
pub use error::{EmitError, EvalError, GateError, GoshError, Result, WorkspaceError};
pub use gate::{BlockLedger, EvaluatorGate};
pub use input::{Console, InputMode, KeyEvent, LinePrompt};
pub use interpreter::{
    CommandFactory, CommandInterpreter, CommandSpec, Evaluation, Interpreter, InterpreterFactory,
};
pub use shell::{offer_tool_emission, Ended, Shell};
pub use signal::ExitLatch;
pub use workspace::{CodeBlock, Session, SessionId, SharedSession, Workspace};

/// gosh version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
