//! Progress reporting for FSM runs.
//!
//! Progress is free text except for one structured token: the literal
//! [`COMPLETION_SENTINEL`] emitted when a run finishes successfully.
//! The channel sink is bounded and never blocks: a consumer that stops
//! draining loses messages (with a warning) instead of stalling the run.

use log::{info, warn};
use tokio::sync::mpsc;

/// Literal token marking successful completion on the progress stream.
pub const COMPLETION_SENTINEL: &str = "---EOF---";

/// Destination for free-text run progress.
#[derive(Clone)]
pub enum ProgressSink {
    /// Bounded channel to a caller-owned receiver.
    Channel(mpsc::Sender<String>),
    /// Route to the `log` facade at info level.
    Log,
    /// Discard everything.
    Null,
}

impl ProgressSink {
    /// Create a channel sink with the given buffer capacity, returning
    /// the receiver for the caller to drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::Channel(tx), rx)
    }

    /// Emit a progress message. Never blocks.
    pub fn emit(&self, message: impl Into<String>) {
        let message = message.into();
        match self {
            Self::Channel(tx) => {
                if let Err(e) = tx.try_send(message) {
                    warn!("progress consumer not draining, dropped message: {e}");
                }
            }
            Self::Log => info!("{message}"),
            Self::Null => {}
        }
    }

    /// Emit the completion sentinel.
    pub fn finish(&self) {
        self.emit(COMPLETION_SENTINEL);
    }
}
