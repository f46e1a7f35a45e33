//! Out-of-band interrupt handling
//!
//! While the terminal is in raw mode Ctrl+C arrives as an ordinary byte and is
//! handled by the assembler. Outside raw mode (during an evaluation, or with
//! piped input) it arrives as SIGINT. A single watcher thread waits for SIGINT
//! or SIGTERM and runs the same termination path as end-of-input, then exits
//! the process.
//!
//! The main loop and the watcher race for one [`ExitLatch`]; whoever claims
//! it runs the exit prompt, so the prompt is never shown twice.
//!
//! The latch also records whether the main loop is inside a blocking stdin
//! read. A read that is already pending cannot be cancelled, so the watcher
//! only asks its question on the terminal when no such read exists:
//!
//! ```text
//! main:    mark reading ──► check claimed ──► read
//! watcher: claim        ──► check reading ──► prompt only if not reading
//! ```
//!
//! Both sides write before they read, so at least one of them sees the other.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{info, warn};

use crate::input::{EditorPrompt, LinePrompt, NoPrompt};
use crate::shell::{offer_tool_emission, Split};
use crate::workspace::SharedSession;

/// Exit status used when the process is stopped by a signal.
pub const INTERRUPTED_STATUS: i32 = 130;

/// One-shot flag deciding who runs the termination path.
#[derive(Debug, Clone, Default)]
pub struct ExitLatch {
    claimed: Arc<AtomicBool>,

    /// Set while the main loop may be blocked reading stdin
    reading: Arc<AtomicBool>,
}

impl ExitLatch {
    /// A latch nobody has claimed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the latch. Returns `true` only for the first caller.
    pub fn try_claim(&self) -> bool {
        !self.claimed.swap(true, Ordering::SeqCst)
    }

    /// Whether someone has claimed the latch.
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Announce a stdin read by the main loop.
    ///
    /// Returns `false`, and withdraws the announcement, if termination has
    /// already been claimed; the read must not start.
    pub fn enter_read(&self) -> bool {
        self.reading.store(true, Ordering::SeqCst);
        if self.is_claimed() {
            self.reading.store(false, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// The read announced by [`enter_read`](Self::enter_read) has returned.
    pub fn leave_read(&self) {
        self.reading.store(false, Ordering::SeqCst);
    }

    /// Whether the main loop may be blocked reading stdin.
    pub fn is_reading(&self) -> bool {
        self.reading.load(Ordering::SeqCst)
    }
}

/// Whether the watcher, holding a claimed `latch`, may ask the exit prompt on
/// the terminal.
pub fn may_prompt(latch: &ExitLatch, interactive: bool) -> bool {
    interactive && !latch.is_reading()
}

/// Start the watcher thread.
///
/// Signal handlers are installed before this returns. With `interactive`
/// set, the exit prompt is asked through a line editor on the terminal,
/// unless the main loop is blocked reading stdin; otherwise stdin belongs to
/// the main loop and the prompt is skipped.
pub fn spawn_watcher(
    session: SharedSession,
    latch: ExitLatch,
    interactive: bool,
) -> io::Result<JoinHandle<()>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let shutdown = {
        let _guard = runtime.enter();
        Shutdown::install()?
    };

    thread::Builder::new()
        .name("gosh-signals".to_string())
        .spawn(move || {
            runtime.block_on(shutdown.recv());
            info!("shutdown signal received");

            if !latch.try_claim() {
                // The main loop is already at the exit prompt
                restore_terminal();
                std::process::exit(INTERRUPTED_STATUS);
            }

            restore_terminal();
            let _ = writeln!(io::stdout());
            let result = if may_prompt(&latch, interactive) {
                terminate(EditorPrompt, &session)
            } else {
                terminate(NoPrompt, &session)
            };
            if let Err(err) = result {
                warn!("exit prompt failed: {err}");
            }
            std::process::exit(0);
        })
}

fn terminate<P: LinePrompt>(prompt: P, session: &SharedSession) -> io::Result<()> {
    let mut term = Split::new(prompt, io::stdout());
    offer_tool_emission(&mut term, session)?;
    term.flush()
}

fn restore_terminal() {
    if let Err(err) = crossterm::terminal::disable_raw_mode() {
        warn!("failed to restore terminal mode: {err}");
    }
}

/// Registered shutdown signals.
struct Shutdown {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl Shutdown {
    /// Register the handlers. Must run inside a tokio runtime context.
    fn install() -> io::Result<Self> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }
        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the first shutdown signal.
    #[cfg_attr(not(unix), allow(unused_mut))]
    async fn recv(mut self) {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => {}
                _ = self.terminate.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("cannot listen for Ctrl+C: {err}");
                std::future::pending::<()>().await;
            }
        }
    }
}
