//! Sessions and their accepted code blocks

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDateTime};
use tracing::{debug, info};

use super::{write_atomic, Workspace};
use crate::error::WorkspaceError;

/// Preamble of every session file.
pub const SESSION_HEADER: &str = "package internal\n\nimport (\n\t\"fmt\"\n)\n\n";

/// Marker written before each block in a session file.
pub const BLOCK_MARKER: &str = "// Block\n";

/// Session identity: the local creation time as `YYYYMMDD_HHMMSS`.
///
/// Identities sort in creation order. Two sessions started within the same
/// second share an identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// `strftime` format of an identity.
    pub const FORMAT: &'static str = "%Y%m%d_%H%M%S";

    /// Identity for the current local time.
    pub fn now() -> Self {
        Self::from_datetime(Local::now().naive_local())
    }

    /// Identity for a given time.
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self(at.format(Self::FORMAT).to_string())
    }

    /// Parse an identity, rejecting anything that is not a valid timestamp.
    pub fn parse(text: &str) -> Option<Self> {
        NaiveDateTime::parse_from_str(text, Self::FORMAT)
            .ok()
            .filter(|_| text.len() == 15)
            .map(|_| Self(text.to_string()))
    }

    /// The identity string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One accepted block of source text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeBlock(String);

impl CodeBlock {
    /// Wrap source text.
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    /// The source text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CodeBlock {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CodeBlock {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}

impl From<String> for CodeBlock {
    fn from(source: String) -> Self {
        Self(source)
    }
}

/// The ordered blocks accepted in one run of the shell.
///
/// The session file on disk is always a full snapshot of [`Session::blocks`]:
/// every append rewrites it, and an append whose write fails is undone.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    workspace: Workspace,
    path: PathBuf,
    blocks: Vec<CodeBlock>,
}

impl Session {
    /// Start a session identified by the current time.
    pub fn create(workspace: &Workspace) -> Result<Self, WorkspaceError> {
        Self::create_with_id(workspace, SessionId::now())
    }

    /// Start a session with an explicit identity.
    ///
    /// Makes sure the workspace scaffold exists. The session file itself is
    /// written on the first append.
    pub fn create_with_id(workspace: &Workspace, id: SessionId) -> Result<Self, WorkspaceError> {
        workspace.ensure_scaffold()?;
        let path = workspace.internal_dir().join(format!("session_{id}.go"));
        info!(session = %id, "session started");
        Ok(Self {
            id,
            workspace: workspace.clone(),
            path,
            blocks: Vec::new(),
        })
    }

    /// Session identity.
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// The workspace this session lives in.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Path of the session file.
    pub fn artifact_path(&self) -> &Path {
        &self.path
    }

    /// Accepted blocks, in insertion order.
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    /// Number of accepted blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether no block has been accepted.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Add a block and rewrite the session file.
    ///
    /// # Errors
    ///
    /// If the file cannot be written the block is removed again, leaving
    /// memory and disk as they were.
    pub fn append(&mut self, block: impl Into<CodeBlock>) -> Result<(), WorkspaceError> {
        self.blocks.push(block.into());
        if let Err(err) = write_atomic(&self.path, &self.render()) {
            self.blocks.pop();
            return Err(err);
        }
        debug!(session = %self.id, blocks = self.blocks.len(), "session file rewritten");
        Ok(())
    }

    /// Forget every block and delete the session file.
    ///
    /// The identity is kept. If the file cannot be removed the blocks are
    /// kept too.
    pub fn clear(&mut self) -> Result<(), WorkspaceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(WorkspaceError::RemoveFile {
                    path: self.path.clone(),
                    source,
                })
            }
        }
        self.blocks.clear();
        info!(session = %self.id, "session cleared");
        Ok(())
    }

    /// The session file contents for the current blocks.
    pub fn render(&self) -> String {
        let mut content = String::from(SESSION_HEADER);
        for block in &self.blocks {
            content.push_str(BLOCK_MARKER);
            content.push_str(block.as_str());
            content.push_str("\n\n");
        }
        content
    }
}

/// A session shared between the main loop and the signal watcher.
///
/// Holders lock only around a single session operation, never across an
/// evaluation.
#[derive(Debug, Clone)]
pub struct SharedSession(Arc<Mutex<Session>>);

impl SharedSession {
    /// Share `session`.
    pub fn new(session: Session) -> Self {
        Self(Arc::new(Mutex::new(session)))
    }

    /// Lock the session.
    ///
    /// A panic while the lock was held does not make the session unusable;
    /// its data is always a consistent snapshot.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
