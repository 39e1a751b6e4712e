//! Console session layer: line framing over a byte transport.
//!
//! A [`ConsoleSession`] turns the raw byte stream of a
//! [`ConsoleTransport`](crate::transport::ConsoleTransport) into
//! timeout-bounded line reads, records every line into the per-run
//! [`Transcript`], and provides the write helpers the state machines use
//! (CRLF-terminated commands and the Ctrl-C interrupt byte).

mod normalize;
mod syslog;
mod transcript;

pub use normalize::{normalize, scrub};
pub use syslog::is_syslog;
pub use transcript::Transcript;

use std::time::Duration;

use bytes::BytesMut;
use log::trace;
use tokio::time::Instant;

use crate::error::Result;
use crate::transport::ConsoleTransport;

/// Interrupt byte sent to break into ROMMON.
pub const CTRL_C: u8 = 0x03;

/// Console session owning a transport, a pending byte buffer, and the
/// run's transcript.
pub struct ConsoleSession<T: ConsoleTransport> {
    pub(crate) transport: T,
    pending: BytesMut,
    transcript: Transcript,
}

impl<T: ConsoleTransport> ConsoleSession<T> {
    /// Create a session over an opened transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pending: BytesMut::with_capacity(4096),
            transcript: Transcript::new(),
        }
    }

    /// Read one line from the device.
    ///
    /// A line ends at `\n` or when `max_len` bytes accumulate. When the
    /// timeout expires first, whatever accumulated (possibly nothing) is
    /// returned as the line. Per-read timeouts are never errors; the
    /// expect loop decides whether to retransmit. Every returned line is
    /// appended raw to the transcript.
    pub async fn read_line(&mut self, max_len: usize, timeout: Duration) -> Result<String> {
        let deadline = Instant::now() + timeout;

        loop {
            if let Some(pos) = memchr::memchr(b'\n', &self.pending) {
                let mut line = self.pending.split_to(pos + 1);
                line.truncate(pos);
                return Ok(self.record(&line));
            }

            if self.pending.len() >= max_len {
                let line = self.pending.split_to(max_len);
                return Ok(self.record(&line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                let line = self.pending.split();
                return Ok(self.record(&line));
            }

            let mut buf = [0u8; 256];
            let n = self.transport.recv(&mut buf, remaining).await?;
            if n == 0 {
                // Timed out; surface the partial line (often a prompt,
                // which never arrives with a trailing newline).
                let line = self.pending.split();
                return Ok(self.record(&line));
            }
            self.pending.extend_from_slice(&buf[..n]);
        }
    }

    fn record(&mut self, raw: &[u8]) -> String {
        let line = String::from_utf8_lossy(raw).into_owned();
        trace!("console <- {line:?}");
        self.transcript.push(line.clone());
        line
    }

    /// Send a command followed by CRLF. An empty string sends a bare CRLF.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("console -> {line:?}");
        let mut out = Vec::with_capacity(line.len() + 2);
        out.extend_from_slice(line.as_bytes());
        out.extend_from_slice(b"\r\n");
        self.transport.send(&out).await
    }

    /// Send raw bytes without any terminator.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.transport.send(data).await
    }

    /// Send a single Ctrl-C (0x03).
    pub async fn send_interrupt(&mut self) -> Result<()> {
        trace!("console -> ^C");
        self.transport.send(&[CTRL_C]).await
    }

    /// The run's transcript.
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::ScriptedTransport;

    const FAST: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_read_line_newline_terminated() {
        let transport = ScriptedTransport::silent().with_output("Router>\nmore\n");
        let mut session = ConsoleSession::new(transport);

        assert_eq!(session.read_line(500, FAST).await.unwrap(), "Router>");
        assert_eq!(session.read_line(500, FAST).await.unwrap(), "more");
    }

    #[tokio::test]
    async fn test_read_line_timeout_returns_partial() {
        // A prompt without a trailing newline: the read must surface it
        // once the timeout expires.
        let transport = ScriptedTransport::silent().with_output("rommon 1 >");
        let mut session = ConsoleSession::new(transport);

        assert_eq!(session.read_line(500, FAST).await.unwrap(), "rommon 1 >");
    }

    #[tokio::test]
    async fn test_read_line_timeout_empty() {
        let transport = ScriptedTransport::silent();
        let mut session = ConsoleSession::new(transport);

        assert_eq!(session.read_line(500, FAST).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_line_buffer_full() {
        let transport = ScriptedTransport::silent().with_output(&"x".repeat(600));
        let mut session = ConsoleSession::new(transport);

        let line = session.read_line(500, FAST).await.unwrap();
        assert_eq!(line.len(), 500);
    }

    #[tokio::test]
    async fn test_every_read_hits_the_transcript() {
        let transport = ScriptedTransport::silent().with_output("one\ntwo\n");
        let mut session = ConsoleSession::new(transport);

        session.read_line(500, FAST).await.unwrap();
        session.read_line(500, FAST).await.unwrap();
        session.read_line(500, FAST).await.unwrap(); // times out empty

        assert_eq!(session.transcript().lines(), ["one", "two", ""]);
    }

    #[tokio::test]
    async fn test_send_line_appends_crlf() {
        let transport = ScriptedTransport::silent();
        let mut session = ConsoleSession::new(transport);
        session.send_line("enable").await.unwrap();
        session.send_line("").await.unwrap();

        // ScriptedTransport keeps writes; reach through for assertions.
        let writes = session.transport.writes_str();
        assert_eq!(writes, ["enable\r\n", "\r\n"]);
    }
}
