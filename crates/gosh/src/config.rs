//! Shell configuration

use std::path::PathBuf;

use crate::assembler::DEFAULT_TAB_WIDTH;
use crate::error::WorkspaceError;
use crate::interpreter::CommandSpec;
use crate::workspace::Workspace;

/// Everything needed to start a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace root directory
    pub workspace_root: PathBuf,

    /// External interpreter launch configuration
    pub interpreter: CommandSpec,

    /// Read line by line even when stdin is a terminal
    pub line_mode: bool,

    /// Spaces inserted for a tab key
    pub tab_width: usize,
}

impl Config {
    /// Defaults rooted at `workspace_root`.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            interpreter: CommandSpec::default(),
            line_mode: false,
            tab_width: DEFAULT_TAB_WIDTH,
        }
    }

    /// Defaults rooted at `~/.gosh`.
    pub fn from_home() -> Result<Self, WorkspaceError> {
        Ok(Self::new(Workspace::default_root()?))
    }

    /// Use a different interpreter.
    pub fn with_interpreter(mut self, interpreter: CommandSpec) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Force line-by-line input.
    pub fn with_line_mode(mut self, line_mode: bool) -> Self {
        self.line_mode = line_mode;
        self
    }

    /// Set the tab width.
    pub fn with_tab_width(mut self, width: usize) -> Self {
        self.tab_width = width;
        self
    }
}
