//! Error types for gosh

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while materializing the workspace or a session on disk.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// A workspace directory could not be created
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A workspace file could not be written
    #[error("failed to write {path}: {source}")]
    WriteFile {
        /// File that could not be written
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// A session artifact could not be removed
    #[error("failed to remove {path}: {source}")]
    RemoveFile {
        /// File that could not be removed
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// No home directory to derive the default workspace root from
    #[error("could not determine the home directory")]
    NoHomeDir,
}

/// Failures reported by the interpreter boundary.
#[derive(Error, Debug)]
pub enum EvalError {
    /// The interpreter process could not be started or talked to
    #[error("failed to run interpreter `{program}`: {source}")]
    Spawn {
        /// Program that was launched
        program: String,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The interpreter rejected the code
    #[error("{message}")]
    Rejected {
        /// Diagnostic text produced by the interpreter
        message: String,
    },
}

impl EvalError {
    /// Create a rejection with the interpreter's diagnostic text.
    pub fn rejected(message: impl Into<String>) -> Self {
        EvalError::Rejected {
            message: message.into(),
        }
    }
}

/// Failures while generating a CLI tool.
#[derive(Error, Debug)]
pub enum EmitError {
    /// The tool name was empty
    #[error("CLI name cannot be empty")]
    EmptyName,

    /// The tool name cannot be used as a directory name
    #[error("invalid CLI name `{name}`: {reason}")]
    InvalidName {
        /// Rejected name
        name: String,
        /// Why the name was rejected
        reason: &'static str,
    },

    /// The tool directory or entry point could not be written
    #[error(transparent)]
    Write(#[from] WorkspaceError),
}

/// Failures of the compile-then-persist gate.
#[derive(Error, Debug)]
pub enum GateError {
    /// The interpreter rejected the block; nothing was persisted
    #[error(transparent)]
    Rejected(EvalError),

    /// The block evaluated but could not be persisted
    #[error("failed to save code: {0}")]
    Persist(#[from] WorkspaceError),

    /// A fresh interpreter could not be created
    #[error("failed to start interpreter: {0}")]
    Startup(EvalError),

    /// Replaying the session into a fresh interpreter failed
    #[error("failed to evaluate code block {}: {source}", .index + 1)]
    Replay {
        /// Zero-based index of the failing block
        index: usize,
        /// Interpreter error for that block
        source: EvalError,
    },
}

/// Umbrella error for shell-level operations.
#[derive(Error, Debug)]
pub enum GoshError {
    /// Terminal or stream I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Workspace error
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Gate error
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Emission error
    #[error(transparent)]
    Emit(#[from] EmitError),
}

/// Result type alias for shell-level operations
pub type Result<T> = std::result::Result<T, GoshError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_error_is_one_based() {
        let err = GateError::Replay {
            index: 2,
            source: EvalError::rejected("undefined: x"),
        };
        assert_eq!(
            err.to_string(),
            "failed to evaluate code block 3: undefined: x"
        );
    }

    #[test]
    fn test_rejected_is_verbatim() {
        let err = GateError::Rejected(EvalError::rejected("1:1: expected statement"));
        assert_eq!(err.to_string(), "1:1: expected statement");
    }

    #[test]
    fn test_empty_name_message() {
        assert_eq!(EmitError::EmptyName.to_string(), "CLI name cannot be empty");
    }
}
