//! Cobra CLI generation from a session
//!
//! A session's blocks become the run body of a single Cobra root command:
//!
//! ```text
//! <root>/cmd/<name>/main.go
//! ```
//!
//! Generation is purely textual. Blocks that were each valid on their own may
//! not compose into a valid program, and nothing here compiles the result.

use std::path::PathBuf;

use tracing::info;

use crate::error::EmitError;
use crate::workspace::{self, CodeBlock, SessionId, Workspace};

/// Name of the generated entry point file.
pub const ENTRY_FILE: &str = "main.go";

/// Indentation applied to every block line inside the run body.
pub const BODY_INDENT: &str = "\t\t";

const NAME_SLOT: &str = "{{name}}";
const SESSION_SLOT: &str = "{{session}}";
const BODY_SLOT: &str = "{{body}}";

/// Template of the generated entry point.
pub const ENTRY_TEMPLATE: &str = r#"package main

import (
	"fmt"
	"os"

	"github.com/spf13/cobra"
)

var rootCmd = &cobra.Command{
	Use:   "{{name}}",
	Short: "Generated CLI from gosh session {{session}}",
	Run: func(cmd *cobra.Command, args []string) {
		// Session code
{{body}}
	},
}

func main() {
	if err := rootCmd.Execute(); err != nil {
		fmt.Fprintln(os.Stderr, err)
		os.Exit(1)
	}
}
"#;

/// Check that `name` can be used as a tool directory name.
///
/// # Errors
///
/// Returns `EmitError::EmptyName` for an empty name and
/// `EmitError::InvalidName` for anything that is not a plain, portable path
/// segment.
pub fn validate_name(name: &str) -> Result<(), EmitError> {
    let invalid = |reason| {
        Err(EmitError::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return Err(EmitError::EmptyName);
    }
    if name == "." || name == ".." {
        return invalid("reserved directory name");
    }
    if name.starts_with('-') {
        return invalid("must not start with '-'");
    }
    if name.contains(['/', '\\']) {
        return invalid("must not contain path separators");
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return invalid("only letters, digits, '-', '_' and '.' are allowed");
    }
    Ok(())
}

/// Render the run body: every non-empty block line, indented.
pub fn render_body(blocks: &[CodeBlock]) -> String {
    let mut body = String::new();
    for line in blocks
        .iter()
        .flat_map(|block| block.as_str().split('\n'))
        .filter(|line| !line.is_empty())
    {
        body.push_str(BODY_INDENT);
        body.push_str(line);
        body.push('\n');
    }
    body
}

/// Render the full entry point source.
pub fn render_entry_point(name: &str, session: &SessionId, blocks: &[CodeBlock]) -> String {
    // The body goes in last so block text is never scanned for slots
    ENTRY_TEMPLATE
        .replace(NAME_SLOT, name)
        .replace(SESSION_SLOT, session.as_str())
        .replace(BODY_SLOT, &render_body(blocks))
}

/// Writes generated tools into a workspace.
#[derive(Debug, Clone, Copy)]
pub struct ToolEmitter<'a> {
    workspace: &'a Workspace,
}

impl<'a> ToolEmitter<'a> {
    /// An emitter for `workspace`.
    pub fn new(workspace: &'a Workspace) -> Self {
        Self { workspace }
    }

    /// Generate `cmd/<name>/main.go` from `blocks`.
    ///
    /// Returns the tool directory. The name is validated before anything is
    /// created on disk.
    pub fn emit(
        &self,
        name: &str,
        session: &SessionId,
        blocks: &[CodeBlock],
    ) -> Result<PathBuf, EmitError> {
        validate_name(name)?;

        let dir = self.workspace.tool_dir(name);
        workspace::create_dir_all(&dir)?;
        workspace::write_atomic(
            &dir.join(ENTRY_FILE),
            &render_entry_point(name, session, blocks),
        )?;

        info!(tool = name, blocks = blocks.len(), "generated CLI tool");
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("demo").is_ok());
        assert!(validate_name("my-tool_2.v1").is_ok());
        assert!(matches!(validate_name(""), Err(EmitError::EmptyName)));
        for bad in [".", "..", "a/b", "a\\b", "-x", "has space", "tab\t", "nul\0"] {
            assert!(
                matches!(validate_name(bad), Err(EmitError::InvalidName { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_render_body_indents_and_drops_blank_lines() {
        let blocks = [CodeBlock::new("x := 1\n\nif x > 0 {\n\tfmt.Println(x)\n}")];
        assert_eq!(
            render_body(&blocks),
            "\t\tx := 1\n\t\tif x > 0 {\n\t\t\tfmt.Println(x)\n\t\t}\n"
        );
    }

    #[test]
    fn test_block_text_is_not_templated() {
        let session = SessionId::parse("20250101_120000").unwrap();
        let blocks = [CodeBlock::new("s := \"{{name}}\"")];
        let source = render_entry_point("demo", &session, &blocks);
        assert!(source.contains("\t\ts := \"{{name}}\"\n"));
    }
}
