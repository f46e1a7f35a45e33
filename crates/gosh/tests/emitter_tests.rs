//! CLI tool generation tests

use std::fs;

use gosh::emitter::{render_entry_point, ENTRY_FILE};
use gosh::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

fn session_id() -> SessionId {
    SessionId::parse("20250102_030405").unwrap()
}

#[test]
fn test_emit_writes_entry_point() {
    let dir = tempdir().unwrap();
    let workspace = Workspace::open(dir.path()).unwrap();
    let blocks = [CodeBlock::new("x := 42"), CodeBlock::new("fmt.Println(x)")];

    let tool = ToolEmitter::new(&workspace)
        .emit("demo", &session_id(), &blocks)
        .unwrap();

    assert_eq!(tool, dir.path().join("cmd").join("demo"));
    let source = fs::read_to_string(tool.join(ENTRY_FILE)).unwrap();
    assert!(source.contains("x := 42"));
    assert!(source.contains("func main()"));
    assert!(source.contains("\"github.com/spf13/cobra\""));
}

#[test]
fn test_entry_point_exact_text() {
    let blocks = [CodeBlock::new("x := 42\n\nfmt.Println(x)")];
    let expected = "package main

import (
\t\"fmt\"
\t\"os\"

\t\"github.com/spf13/cobra\"
)

var rootCmd = &cobra.Command{
\tUse:   \"demo\",
\tShort: \"Generated CLI from gosh session 20250102_030405\",
\tRun: func(cmd *cobra.Command, args []string) {
\t\t// Session code
\t\tx := 42
\t\tfmt.Println(x)

\t},
}

func main() {
\tif err := rootCmd.Execute(); err != nil {
\t\tfmt.Fprintln(os.Stderr, err)
\t\tos.Exit(1)
\t}
}
";
    assert_eq!(render_entry_point("demo", &session_id(), &blocks), expected);
}

#[test]
fn test_emit_overwrites_existing_tool() {
    let dir = tempdir().unwrap();
    let workspace = Workspace::open(dir.path()).unwrap();
    let emitter = ToolEmitter::new(&workspace);

    emitter
        .emit("demo", &session_id(), &[CodeBlock::new("a := 1")])
        .unwrap();
    let tool = emitter
        .emit("demo", &session_id(), &[CodeBlock::new("b := 2")])
        .unwrap();

    let source = fs::read_to_string(tool.join(ENTRY_FILE)).unwrap();
    assert!(source.contains("b := 2"));
    assert!(!source.contains("a := 1"));
}

#[test]
fn test_empty_name_creates_nothing() {
    let dir = tempdir().unwrap();
    let workspace = Workspace::open(dir.path()).unwrap();

    let err = ToolEmitter::new(&workspace)
        .emit("", &session_id(), &[CodeBlock::new("x := 1")])
        .unwrap_err();

    assert!(matches!(err, EmitError::EmptyName));
    assert_eq!(err.to_string(), "CLI name cannot be empty");
    assert!(!dir.path().join("cmd").exists());
}

#[test]
fn test_path_escape_is_rejected() {
    let dir = tempdir().unwrap();
    let workspace = Workspace::open(dir.path().join("ws")).unwrap();

    let err = ToolEmitter::new(&workspace)
        .emit("../escape", &session_id(), &[])
        .unwrap_err();

    assert!(matches!(err, EmitError::InvalidName { .. }));
    assert!(!dir.path().join("escape").exists());
}

#[test]
fn test_unwritable_tool_dir_is_reported() {
    let dir = tempdir().unwrap();
    let workspace = Workspace::open(dir.path()).unwrap();
    fs::write(dir.path().join("cmd"), "not a directory").unwrap();

    let err = ToolEmitter::new(&workspace)
        .emit("demo", &session_id(), &[CodeBlock::new("x := 1")])
        .unwrap_err();

    assert!(matches!(
        err,
        EmitError::Write(WorkspaceError::CreateDir { .. })
    ));
    assert_eq!(
        fs::read_to_string(dir.path().join("cmd")).unwrap(),
        "not a directory"
    );
}
