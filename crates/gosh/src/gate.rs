//! The compile-then-persist gate
//!
//! A block reaches the workspace only through [`EvaluatorGate::try_eval`],
//! which evaluates it first and persists it only on success:
//!
//! ```text
//! try_eval(code)
//!   1. interpreter.eval(code)   ── Err ──► GateError::Rejected, nothing stored
//!   2. ledger.commit(code)      ── Err ──► GateError::Persist
//!   3. Ok(evaluation)
//! ```
//!
//! A rejected block may have changed interpreter state before failing; that
//! state is not rolled back. [`EvaluatorGate::reload`] rebuilds the
//! interpreter from the persisted blocks alone.

use tracing::{debug, info, warn};

use crate::error::{GateError, WorkspaceError};
use crate::interpreter::{Evaluation, Interpreter, InterpreterFactory};
use crate::workspace::{CodeBlock, Session, SharedSession};

/// Durable, ordered storage for accepted blocks.
pub trait BlockLedger {
    /// Persist an accepted block after the last one.
    fn commit(&mut self, block: CodeBlock) -> Result<(), WorkspaceError>;

    /// Every persisted block, in order.
    fn snapshot(&self) -> Vec<CodeBlock>;
}

impl BlockLedger for Session {
    fn commit(&mut self, block: CodeBlock) -> Result<(), WorkspaceError> {
        self.append(block)
    }

    fn snapshot(&self) -> Vec<CodeBlock> {
        self.blocks().to_vec()
    }
}

impl BlockLedger for SharedSession {
    fn commit(&mut self, block: CodeBlock) -> Result<(), WorkspaceError> {
        self.lock().append(block)
    }

    fn snapshot(&self) -> Vec<CodeBlock> {
        self.lock().blocks().to_vec()
    }
}

/// Owns the live interpreter and the factory used to rebuild it.
///
/// Each gate has its own interpreter, so independent gates never observe
/// each other's state.
pub struct EvaluatorGate<F: InterpreterFactory> {
    factory: F,
    interpreter: F::Interpreter,
}

impl<F: InterpreterFactory> EvaluatorGate<F> {
    /// Create a gate with a fresh interpreter from `factory`.
    pub fn new(factory: F) -> Result<Self, GateError> {
        let interpreter = factory.create().map_err(GateError::Startup)?;
        Ok(Self {
            factory,
            interpreter,
        })
    }

    /// The live interpreter.
    pub fn interpreter(&self) -> &F::Interpreter {
        &self.interpreter
    }

    /// The factory used by [`reload`](Self::reload).
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Evaluate `code` and, only if that succeeds, commit it to `ledger`.
    ///
    /// # Errors
    ///
    /// - `GateError::Rejected` if the interpreter refused the code; the
    ///   ledger is untouched.
    /// - `GateError::Persist` if the code evaluated but could not be stored.
    pub fn try_eval<L>(&mut self, code: &str, ledger: &mut L) -> Result<Evaluation, GateError>
    where
        L: BlockLedger + ?Sized,
    {
        let evaluation = self.interpreter.eval(code).map_err(|err| {
            debug!("block rejected: {err}");
            GateError::Rejected(err)
        })?;

        if let Err(err) = ledger.commit(CodeBlock::new(code)) {
            warn!("block evaluated but was not saved: {err}");
            return Err(err.into());
        }
        Ok(evaluation)
    }

    /// Replace the interpreter with a fresh one that has replayed every block
    /// in `ledger`, in order.
    ///
    /// Returns the number of blocks replayed. On failure the previous
    /// interpreter stays live and the ledger is unchanged.
    pub fn reload<L>(&mut self, ledger: &L) -> Result<usize, GateError>
    where
        L: BlockLedger + ?Sized,
    {
        let mut fresh = self.factory.create().map_err(GateError::Startup)?;
        let blocks = ledger.snapshot();

        for (index, block) in blocks.iter().enumerate() {
            fresh
                .eval(block.as_str())
                .map_err(|source| GateError::Replay { index, source })?;
        }

        self.interpreter = fresh;
        info!(blocks = blocks.len(), "interpreter reloaded");
        Ok(blocks.len())
    }
}
