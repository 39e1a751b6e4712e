//! Recovery state machines and their shared run plumbing.
//!
//! Each run owns its state: a [`RunContext`] bundles the console session
//! (with its transcript), the progress sink, and the run's
//! cancellation/deadline control, and is passed by `&mut` into one FSM
//! entry point. Nothing is process-global, so concurrent runs on
//! different lines cannot interfere.

mod prompt;
pub mod router_defaults;
pub mod router_reset;
pub mod switch_reset;

pub use prompt::{CliMode, Prompt};
pub use router_defaults::RouterDefaults;
pub use router_reset::RouterReset;
pub use switch_reset::SwitchReset;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::console::{ConsoleSession, Transcript};
use crate::error::{Result, RunError};
use crate::expect::{await_condition, ExpectOptions, LineMatcher};
use crate::progress::ProgressSink;
use crate::transport::ConsoleTransport;

/// Run-level cancellation and deadline.
///
/// Per-read timeouts bound a single read; this bounds the whole run. The
/// expect loop checks it once per iteration, so an otherwise unbounded
/// retry loop against a dead device ends when the caller says so.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl RunControl {
    /// No deadline, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a deadline `timeout` from now.
    pub fn with_deadline_in(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Token the caller can hold to cancel the run from elsewhere.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the run at the next expect iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Trip if cancelled or past the deadline.
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(RunError::Cancelled.into());
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(RunError::DeadlineExceeded.into());
            }
        }
        Ok(())
    }
}

/// Confirmation of a physical operator action (e.g. holding the Mode
/// button while reconnecting power during switch recovery).
#[async_trait]
pub trait OperatorGate: Send + Sync {
    /// Returns false to abort the run.
    async fn confirm(&self, message: &str) -> bool;
}

/// Gate that confirms everything; for unattended runs and tests.
pub struct AutoConfirm;

#[async_trait]
impl OperatorGate for AutoConfirm {
    async fn confirm(&self, _message: &str) -> bool {
        true
    }
}

/// Everything one FSM run owns: the console session (with transcript),
/// the progress sink, and the run control.
pub struct RunContext<T: ConsoleTransport> {
    session: ConsoleSession<T>,
    progress: ProgressSink,
    control: RunControl,
}

impl<T: ConsoleTransport> RunContext<T> {
    pub fn new(transport: T, progress: ProgressSink, control: RunControl) -> Self {
        Self {
            session: ConsoleSession::new(transport),
            progress,
            control,
        }
    }

    /// Run the expect loop against this context's session.
    pub async fn await_line<M>(&mut self, matcher: &M, options: &ExpectOptions) -> Result<String>
    where
        M: LineMatcher + ?Sized,
    {
        await_condition(&mut self.session, &self.control, matcher, options).await
    }

    /// Send a CRLF-terminated command line.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        self.session.send_line(line).await
    }

    /// One bounded read, no retry loop; used for best-effort commands
    /// whose reply is not awaited.
    pub async fn read_once(&mut self, max_len: usize, timeout: Duration) -> Result<String> {
        self.session.read_line(max_len, timeout).await
    }

    /// Emit free-text progress.
    pub fn progress(&self, message: impl Into<String>) {
        self.progress.emit(message);
    }

    /// Emit the completion sentinel.
    pub fn finish(&self) {
        self.progress.finish();
    }

    pub fn control(&self) -> &RunControl {
        &self.control
    }

    pub fn session_mut(&mut self) -> &mut ConsoleSession<T> {
        &mut self.session
    }

    pub fn transcript(&self) -> &Transcript {
        self.session.transcript()
    }

    /// Flush the transcript to a file for offline review.
    pub async fn dump_transcript(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        self.session.transcript().flush_to(path).await
    }
}
