//! Byte-level key decoding for raw terminal input
//!
//! A raw terminal hands us bytes, not keys. [`KeyDecoder`] is a small state
//! machine that classifies each byte as it arrives and emits [`KeyEvent`]s.
//!
//! # Newline vs. hard-submit
//!
//! Most terminals send CR for Enter and many send the same CR for Ctrl+Enter,
//! so the two cannot always be told apart. The decoder uses this heuristic:
//!
//! ```text
//! Idle      --CR-->  Newline, PendingCr
//! PendingCr --LF-->  (swallowed: CRLF is one newline), Idle
//! PendingCr --x -->  Idle, then x is decoded normally
//! Idle      --LF-->  HardSubmit
//! ```
//!
//! Known limitations: a terminal that sends a bare LF for Enter submits every
//! line, and a terminal that sends CR for Ctrl+Enter only produces newlines
//! (Ctrl+J or Ctrl+D still submit). A CR typed directly before a Ctrl+J
//! collapses into a single newline.

use std::collections::VecDeque;

use super::KeyEvent;

const CTRL_C: u8 = 0x03;
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x08;
const TAB: u8 = 0x09;
const LF: u8 = 0x0a;
const CR: u8 = 0x0d;
const ESC: u8 = 0x1b;
const DEL: u8 = 0x7f;

/// Decoder state between bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    /// A CR was just decoded; a following LF belongs to it
    PendingCr,
    /// Saw ESC, waiting for the sequence introducer
    Escape,
    /// Inside `ESC [`, waiting for the final byte
    Csi,
    /// Inside `ESC O`, waiting for the key byte
    Ss3,
    /// Collecting a multi-byte UTF-8 character
    Utf8 { buf: [u8; 4], len: usize, need: usize },
}

/// Incremental byte-to-key decoder.
///
/// # Example
///
/// ```
/// use std::collections::VecDeque;
/// use gosh::input::{KeyDecoder, KeyEvent};
///
/// let mut decoder = KeyDecoder::new();
/// let mut events = VecDeque::new();
/// for byte in b"a\r\n" {
///     decoder.feed(*byte, &mut events);
/// }
/// assert_eq!(
///     events.into_iter().collect::<Vec<_>>(),
///     vec![KeyEvent::Printable('a'), KeyEvent::Newline]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct KeyDecoder {
    state: State,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    /// Create a decoder in the idle state.
    pub fn new() -> Self {
        Self { state: State::Idle }
    }

    /// Whether the decoder is between keys.
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle | State::PendingCr)
    }

    /// Decode one byte, pushing any completed events onto `out`.
    pub fn feed(&mut self, byte: u8, out: &mut VecDeque<KeyEvent>) {
        match self.state {
            State::PendingCr => {
                self.state = State::Idle;
                if byte != LF {
                    self.feed_idle(byte, out);
                }
            }
            State::Idle => self.feed_idle(byte, out),
            State::Escape => {
                self.state = match byte {
                    b'[' => State::Csi,
                    b'O' => State::Ss3,
                    _ => {
                        out.push_back(KeyEvent::Unknown);
                        State::Idle
                    }
                };
            }
            State::Csi => {
                // Parameter and intermediate bytes keep the sequence open
                if (0x40..=0x7e).contains(&byte) {
                    out.push_back(KeyEvent::Unknown);
                    self.state = State::Idle;
                }
            }
            State::Ss3 => {
                out.push_back(KeyEvent::Unknown);
                self.state = State::Idle;
            }
            State::Utf8 { mut buf, len, need } => {
                if byte & 0xc0 != 0x80 {
                    out.push_back(KeyEvent::Unknown);
                    self.state = State::Idle;
                    self.feed_idle(byte, out);
                    return;
                }
                buf[len] = byte;
                let len = len + 1;
                if len < need {
                    self.state = State::Utf8 { buf, len, need };
                    return;
                }
                self.state = State::Idle;
                let event = std::str::from_utf8(&buf[..len])
                    .ok()
                    .and_then(|s| s.chars().next())
                    .map_or(KeyEvent::Unknown, KeyEvent::Printable);
                out.push_back(event);
            }
        }
    }

    fn feed_idle(&mut self, byte: u8, out: &mut VecDeque<KeyEvent>) {
        let event = match byte {
            CR => {
                self.state = State::PendingCr;
                KeyEvent::Newline
            }
            LF => KeyEvent::HardSubmit,
            CTRL_C => KeyEvent::Cancel,
            CTRL_D => KeyEvent::EndOfInput,
            BACKSPACE | DEL => KeyEvent::Backspace,
            TAB => KeyEvent::Tab,
            ESC => {
                self.state = State::Escape;
                return;
            }
            0x20..=0x7e => KeyEvent::Printable(byte as char),
            _ => match utf8_width(byte) {
                Some(need) => {
                    let mut buf = [0; 4];
                    buf[0] = byte;
                    self.state = State::Utf8 { buf, len: 1, need };
                    return;
                }
                None => KeyEvent::Unknown,
            },
        };
        out.push_back(event);
    }
}

/// Encoded length announced by a UTF-8 lead byte.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0xc2..=0xdf => Some(2),
        0xe0..=0xef => Some(3),
        0xf0..=0xf4 => Some(4),
        _ => None,
    }
}
