//! Key decoding and console tests

use std::collections::VecDeque;
use std::io::Cursor;

use gosh::input::{KeyDecoder, CONTINUATION, PROMPT};
use gosh::*;
use pretty_assertions::assert_eq;

fn decode(bytes: &[u8]) -> Vec<KeyEvent> {
    let mut decoder = KeyDecoder::new();
    let mut events = VecDeque::new();
    for byte in bytes {
        decoder.feed(*byte, &mut events);
    }
    events.into_iter().collect()
}

fn console(input: &[u8], mode: InputMode) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
    Console::new(Cursor::new(input.to_vec()), Vec::new(), mode)
}

fn output(console: Console<Cursor<Vec<u8>>, Vec<u8>>) -> String {
    let (_, out) = console.into_parts();
    String::from_utf8(out).unwrap()
}

// ═══════════════════════════════════════════════════════════════════════
// Decoder
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_decode_enter_variants() {
    assert_eq!(decode(b"\r"), vec![KeyEvent::Newline]);
    assert_eq!(decode(b"\r\n"), vec![KeyEvent::Newline]);
    assert_eq!(decode(b"\n"), vec![KeyEvent::HardSubmit]);
    assert_eq!(decode(b"\r\r"), vec![KeyEvent::Newline, KeyEvent::Newline]);
    assert_eq!(
        decode(b"\r\n\n"),
        vec![KeyEvent::Newline, KeyEvent::HardSubmit]
    );
}

#[test]
fn test_decode_control_keys() {
    assert_eq!(
        decode(b"\x03\x04\x7f\x08\x09"),
        vec![
            KeyEvent::Cancel,
            KeyEvent::EndOfInput,
            KeyEvent::Backspace,
            KeyEvent::Backspace,
            KeyEvent::Tab,
        ]
    );
}

#[test]
fn test_decode_escape_sequences_are_unknown() {
    // Up arrow, then F1, then Alt+x
    assert_eq!(
        decode(b"\x1b[A\x1bOP\x1bx"),
        vec![KeyEvent::Unknown, KeyEvent::Unknown, KeyEvent::Unknown]
    );
    // Sequences with parameters stay open until their final byte
    assert_eq!(decode(b"\x1b[1;5Cz"), vec![KeyEvent::Unknown, KeyEvent::Printable('z')]);
}

#[test]
fn test_decode_utf8() {
    assert_eq!(
        decode("é→😀".as_bytes()),
        vec![
            KeyEvent::Printable('é'),
            KeyEvent::Printable('→'),
            KeyEvent::Printable('😀'),
        ]
    );
}

#[test]
fn test_decode_truncated_utf8() {
    assert_eq!(decode(&[0xe2, b'a']), vec![KeyEvent::Unknown, KeyEvent::Printable('a')]);
}

// ═══════════════════════════════════════════════════════════════════════
// Interactive console
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_interactive_echo_and_submit() {
    let mut console = console(b"x := 1\r", InputMode::Interactive);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("x := 1".to_string())
    );
    assert_eq!(output(console), format!("{PROMPT}x := 1\r\n"));
}

#[test]
fn test_interactive_continuation_prompt() {
    let mut console = console(b"if x {\r}\r", InputMode::Interactive);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("if x {\n}".to_string())
    );
    assert_eq!(
        output(console),
        format!("{PROMPT}if x {{\r\n{CONTINUATION}}}\r\n")
    );
}

#[test]
fn test_interactive_backspace_erases() {
    let mut console = console(b"ab\x7f\r", InputMode::Interactive);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("a".to_string())
    );
    assert_eq!(output(console), format!("{PROMPT}ab\x08 \x08\r\n"));
}

#[test]
fn test_interactive_cancel_then_exit() {
    let mut console = console(b"if x {\r\x03\x03", InputMode::Interactive);
    let mut asm = BlockAssembler::new();
    assert_eq!(console.read_block(&mut asm).unwrap(), Directive::Terminate);
    assert_eq!(
        output(console),
        format!("{PROMPT}if x {{\r\n{CONTINUATION}^C\r\n{PROMPT}^C\r\n")
    );
}

#[test]
fn test_interactive_ctrl_j_submits_unbalanced() {
    let mut console = console(b"f(\n", InputMode::Interactive);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("f(".to_string())
    );
}

#[test]
fn test_interactive_stream_end_terminates() {
    let mut console = console(b"", InputMode::Interactive);
    let mut asm = BlockAssembler::new();
    assert_eq!(console.read_block(&mut asm).unwrap(), Directive::Terminate);
    assert_eq!(output(console), format!("{PROMPT}^D\r\n"));
}

// ═══════════════════════════════════════════════════════════════════════
// Piped console
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_piped_blank_line_submits() {
    let mut console = console(b"if x {\ny()\n\nz := 1\n", InputMode::Piped);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("if x {\ny()".to_string())
    );
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("z := 1".to_string())
    );
    assert_eq!(console.read_block(&mut asm).unwrap(), Directive::Terminate);
}

#[test]
fn test_piped_eof_flushes_pending() {
    let mut console = console(b"func f() {\n\treturn", InputMode::Piped);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Submit("func f() {\n\treturn".to_string())
    );
}

#[test]
fn test_piped_builtin() {
    let mut console = console(b"workspace\n", InputMode::Piped);
    let mut asm = BlockAssembler::new();
    assert_eq!(
        console.read_block(&mut asm).unwrap(),
        Directive::Command(Builtin::Workspace)
    );
    assert!(!console.owns_terminal());
}
