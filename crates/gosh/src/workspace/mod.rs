//! The durable workspace
//!
//! Everything gosh keeps lives under one root directory:
//!
//! ```text
//! <root>/go.mod                       module scaffold, created once
//! <root>/internal/session_<ID>.go     one file per session, rewritten per block
//! <root>/cmd/<tool>/main.go           one entry point per generated tool
//! ```
//!
//! [`Workspace`] owns the root and the scaffold; [`Session`] owns one session
//! file and the ordered blocks behind it.

mod session;

pub use session::{CodeBlock, Session, SessionId, SharedSession, BLOCK_MARKER, SESSION_HEADER};

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::WorkspaceError;

/// Directory name of the default workspace under the home directory.
pub const DEFAULT_DIR_NAME: &str = ".gosh";

/// Directory holding session files.
pub const INTERNAL_DIR: &str = "internal";

/// Directory holding generated tools.
pub const CMD_DIR: &str = "cmd";

/// Module file written at the workspace root.
pub const MODULE_FILE: &str = "go.mod";

/// Contents of a freshly created module file.
pub const MODULE_CONTENT: &str = "module gosh\n\ngo 1.25\n";

/// A workspace root with its module scaffold in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Open the workspace at `root`, creating the scaffold if needed.
    ///
    /// Safe to call repeatedly: directories that exist are kept and an
    /// existing `go.mod` is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError` if a directory or the module file cannot be
    /// created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let workspace = Self { root: root.into() };
        workspace.ensure_scaffold()?;
        info!(root = %workspace.root.display(), "workspace ready");
        Ok(workspace)
    }

    /// The default workspace root, `~/.gosh`.
    pub fn default_root() -> Result<PathBuf, WorkspaceError> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(DEFAULT_DIR_NAME))
            .ok_or(WorkspaceError::NoHomeDir)
    }

    /// The workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding session files.
    pub fn internal_dir(&self) -> PathBuf {
        self.root.join(INTERNAL_DIR)
    }

    /// Directory a tool named `name` is generated into.
    pub fn tool_dir(&self, name: &str) -> PathBuf {
        self.root.join(CMD_DIR).join(name)
    }

    /// Create the root, `internal/`, and `go.mod` if any are missing.
    pub fn ensure_scaffold(&self) -> Result<(), WorkspaceError> {
        create_dir_all(&self.root)?;
        create_dir_all(&self.internal_dir())?;

        let module = self.root.join(MODULE_FILE);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&module)
        {
            Ok(mut file) => {
                file.write_all(MODULE_CONTENT.as_bytes())
                    .map_err(|source| WorkspaceError::WriteFile {
                        path: module.clone(),
                        source,
                    })?;
                debug!(path = %module.display(), "created module file");
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(source) => return Err(WorkspaceError::WriteFile { path: module, source }),
        }
        Ok(())
    }
}

pub(crate) fn create_dir_all(path: &Path) -> Result<(), WorkspaceError> {
    fs::create_dir_all(path).map_err(|source| WorkspaceError::CreateDir {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace `path` with `contents` in one step.
///
/// The data goes to a temporary file next to `path` which is then renamed
/// over it, so readers see either the old or the new contents in full.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<(), WorkspaceError> {
    let write_err = |source| WorkspaceError::WriteFile {
        path: path.to_path_buf(),
        source,
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(contents.as_bytes()).map_err(write_err)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Temporary files are created 0600
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
