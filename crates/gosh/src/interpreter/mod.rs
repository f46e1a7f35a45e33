//! The interpreter boundary
//!
//! gosh never interprets code itself. It talks to an [`Interpreter`], a
//! stateful service that evaluates one source fragment at a time, and to an
//! [`InterpreterFactory`] that builds fresh instances when the session is
//! replayed.
//!
//! ```text
//! block ──► Interpreter::eval ──► Ok(Evaluation) ──► workspace
//!                              └► Err(EvalError)  ──► reported, dropped
//! ```

mod command;

pub use command::{
    CommandFactory, CommandInterpreter, CommandSpec, DEFAULT_PRELUDE, DEFAULT_PROGRAM,
};

use crate::error::EvalError;

/// Result of evaluating one fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// Output the fragment produced
    pub output: String,
}

impl Evaluation {
    /// An evaluation that produced `output`.
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            output: output.into(),
        }
    }

    /// An evaluation that produced no output.
    pub fn silent() -> Self {
        Self::default()
    }
}

/// A stateful evaluator for source fragments.
///
/// State carries across calls on the same instance: a fragment may refer to
/// anything earlier fragments defined. A failing call may still have changed
/// that state; implementations are not required to roll it back.
pub trait Interpreter {
    /// Evaluate one fragment.
    ///
    /// # Errors
    ///
    /// Returns `EvalError` if the fragment does not compile or fails at run
    /// time, or if the interpreter itself is unavailable.
    fn eval(&mut self, source: &str) -> Result<Evaluation, EvalError>;
}

/// Builds fresh interpreter instances.
pub trait InterpreterFactory {
    /// The interpreter this factory creates
    type Interpreter: Interpreter;

    /// Create an interpreter with no session state.
    fn create(&self) -> Result<Self::Interpreter, EvalError>;
}
